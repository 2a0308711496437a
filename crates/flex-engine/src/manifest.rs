//! RunManifest: the (input, output, fingerprint) triples of the last
//! successful run

use crate::error::{WriteError, WriteResult};
use crate::writer::{atomic_write, WriteRecord, WriteStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Input path relative to the input directory
    pub input: PathBuf,
    /// Output path relative to the output directory
    pub output: PathBuf,
    pub fingerprint: String,
    pub status: WriteStatus,
}

impl ManifestEntry {
    pub fn from_record(input: &Path, record: &WriteRecord) -> Self {
        Self {
            input: input.to_path_buf(),
            output: record.output.clone(),
            fingerprint: record.fingerprint.clone(),
            status: record.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub version: u32,
    pub entries: Vec<ManifestEntry>,
}

impl Default for RunManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: Vec::new(),
        }
    }
}

impl RunManifest {
    /// Read the manifest of the previous run.
    ///
    /// A missing, unreadable or foreign manifest yields an empty one: the
    /// manifest only drives stale detection, it never blocks a run.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read run manifest, ignoring it");
                return Self::default();
            }
        };

        match serde_json::from_str::<RunManifest>(&content) {
            Ok(manifest) if manifest.version == MANIFEST_VERSION => manifest,
            Ok(manifest) => {
                warn!(
                    path = %path.display(),
                    version = manifest.version,
                    "Unsupported run manifest version, ignoring it"
                );
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt run manifest, ignoring it");
                Self::default()
            }
        }
    }

    /// Rewrite the manifest atomically
    pub fn save(&self, path: &Path) -> WriteResult<()> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| WriteError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        json.push('\n');
        atomic_write(path, json.as_bytes())
    }

    /// Entries of the previous run whose input was regenerated in this run
    /// but whose output was not produced again
    pub fn stale_outputs(&self, regenerated: &HashSet<&Path>, current: &RunManifest) -> Vec<PathBuf> {
        let produced: HashSet<&Path> = current.entries.iter().map(|e| e.output.as_path()).collect();
        let mut stale: Vec<PathBuf> = Vec::new();
        for entry in &self.entries {
            if regenerated.contains(entry.input.as_path())
                && !produced.contains(entry.output.as_path())
                && !stale.contains(&entry.output)
            {
                stale.push(entry.output.clone());
            }
        }
        stale
    }

    /// Entries recorded for `input`, in order
    pub fn entries_for<'m>(&'m self, input: &'m Path) -> impl Iterator<Item = &'m ManifestEntry> + 'm {
        self.entries.iter().filter(move |entry| entry.input == input)
    }

    /// Number of entries written (not unchanged) in the run that produced
    /// this manifest
    pub fn changed(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status == WriteStatus::Written)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn entry(input: &str, output: &str, status: WriteStatus) -> ManifestEntry {
        ManifestEntry {
            input: PathBuf::from(input),
            output: PathBuf::from(output),
            fingerprint: "00".to_string(),
            status,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".flextool-manifest.json");

        let manifest = RunManifest {
            version: MANIFEST_VERSION,
            entries: vec![entry("a.hpp", "a.hpp.enum-to-string.hpp", WriteStatus::Written)],
        };
        manifest.save(&path).unwrap();

        assert_eq!(RunManifest::load(&path), manifest);
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["entries"][0]["status"], "written");
    }

    #[test]
    fn test_missing_or_corrupt_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        assert_eq!(RunManifest::load(&path), RunManifest::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(RunManifest::load(&path), RunManifest::default());

        std::fs::write(&path, r#"{ "version": 99, "entries": [] }"#).unwrap();
        assert_eq!(RunManifest::load(&path), RunManifest::default());
    }

    #[test]
    fn test_stale_outputs() {
        let previous = RunManifest {
            version: MANIFEST_VERSION,
            entries: vec![
                entry("a.hpp", "a.hpp.enum-to-string.hpp", WriteStatus::Written),
                entry("a.hpp", "a.hpp.enum-to-json.hpp", WriteStatus::Written),
                entry("b.hpp", "b.hpp.enum-to-json.hpp", WriteStatus::Written),
            ],
        };
        let current = RunManifest {
            version: MANIFEST_VERSION,
            entries: vec![entry("a.hpp", "a.hpp.enum-to-string.hpp", WriteStatus::Unchanged)],
        };

        // b.hpp was not regenerated, so its output is not stale
        let regenerated: HashSet<&Path> = [Path::new("a.hpp")].into_iter().collect();
        assert_eq!(
            previous.stale_outputs(&regenerated, &current),
            vec![PathBuf::from("a.hpp.enum-to-json.hpp")]
        );
        assert_eq!(current.changed(), 0);
        assert_eq!(previous.changed(), 3);
    }
}
