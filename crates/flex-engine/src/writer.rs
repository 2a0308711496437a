//! Emission Writer
//!
//! Writes fragment batches under the output directory. A batch is checked
//! for path collisions as a whole before anything is written, and every file
//! is replaced atomically (temp file in the same directory, then rename).

use crate::error::{WriteError, WriteResult};
use crate::fingerprint::file_fingerprint;
use crate::layout::GeneratedFragment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// What happened to one fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Written,
    /// The file on disk already had this content and was not touched
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub input: PathBuf,
    /// Relative to the output directory
    pub output: PathBuf,
    pub fingerprint: String,
    pub status: WriteStatus,
}

/// Single owner of all writes below one output directory
#[derive(Debug)]
pub struct EmissionWriter {
    out_dir: PathBuf,
    /// Output path -> origin of the fragment that claimed it in this run
    claimed: HashMap<PathBuf, String>,
}

impl EmissionWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            claimed: HashMap::new(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write the fragments of one translation unit.
    ///
    /// Fails with `OutputCollision` before writing anything when a target is
    /// claimed twice within the batch or was already written by an earlier
    /// batch of this run.
    pub fn write_batch(&mut self, fragments: &[GeneratedFragment]) -> WriteResult<Vec<WriteRecord>> {
        let mut batch: HashMap<&Path, &str> = HashMap::new();
        for fragment in fragments {
            let output = fragment.output.as_path();
            let earlier = batch
                .get(output)
                .copied()
                .or_else(|| self.claimed.get(output).map(String::as_str));
            if let Some(first) = earlier {
                return Err(WriteError::OutputCollision {
                    path: fragment.output.clone(),
                    first: first.to_string(),
                    second: fragment.origin.clone(),
                });
            }
            batch.insert(output, fragment.origin.as_str());
        }

        for fragment in fragments {
            self.claimed
                .insert(fragment.output.clone(), fragment.origin.clone());
        }

        fragments
            .iter()
            .map(|fragment| self.write_fragment(fragment))
            .collect()
    }

    fn write_fragment(&self, fragment: &GeneratedFragment) -> WriteResult<WriteRecord> {
        let target = self.out_dir.join(&fragment.output);

        let existing = file_fingerprint(&target).map_err(|e| WriteError::io(&target, &e))?;
        let status = if existing.as_deref() == Some(fragment.fingerprint.as_str()) {
            trace!(path = %target.display(), "Unchanged, skipping write");
            WriteStatus::Unchanged
        } else {
            atomic_write(&target, fragment.contents.as_bytes())?;
            debug!(path = %target.display(), bytes = fragment.contents.len(), "Wrote generated file");
            WriteStatus::Written
        };

        Ok(WriteRecord {
            input: fragment.input.clone(),
            output: fragment.output.clone(),
            fingerprint: fragment.fingerprint.clone(),
            status,
        })
    }
}

/// Replace `target` with `bytes` so readers never see a partial file
pub(crate) fn atomic_write(target: &Path, bytes: &[u8]) -> WriteResult<()> {
    let parent = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| WriteError::io(parent, &e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| WriteError::io(parent, &e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| WriteError::io(temp.path(), &e))?;
    temp.persist(target)
        .map_err(|e| WriteError::io(target, &e.error))?;
    Ok(())
}
