//! Run pipeline: parse -> scan -> generate -> write, for many files
//!
//! Each input file is handled by a blocking worker (its own parser, its own
//! scanner pass) under a semaphore sized by `jobs`. Finished batches go
//! through a bounded queue to a single writer thread, which answers each
//! batch over a oneshot channel. A file's batch is written in one piece, so
//! outputs of different files never interleave.

use crate::engine::{CodeGenerator, FileOutput};
use crate::error::{RunError, RunResult, WriteResult};
use crate::layout::{GeneratedFragment, Layout};
use crate::manifest::{ManifestEntry, RunManifest};
use crate::report::RunReport;
use crate::writer::{EmissionWriter, WriteRecord, WriteStatus};
use flex_ast::{AstProvider, ParseFailure};
use flex_config::{logging::file_span, AppConfig, OutputLayout};
use flex_plugin_system::PluginRegistry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

/// Settings of one run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub out_dir: PathBuf,
    /// Base for `<source-rel-path>` in output names
    pub in_dir: Option<PathBuf>,
    /// `-I` paths handed to the AST provider
    pub include_paths: Vec<PathBuf>,
    pub layout: OutputLayout,
    pub default_extension: String,
    pub manifest_name: String,
    pub remove_stale: bool,
    pub jobs: usize,
    pub file_timeout: Duration,
    pub marker_prefix: String,
    pub strict_capabilities: bool,
}

impl PipelineOptions {
    pub fn from_config(
        config: &AppConfig,
        out_dir: PathBuf,
        in_dir: Option<PathBuf>,
        include_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            out_dir,
            in_dir,
            include_paths,
            layout: config.output.layout,
            default_extension: config.output.default_extension.clone(),
            manifest_name: config.output.manifest_name.clone(),
            remove_stale: config.output.remove_stale,
            jobs: config.runtime.jobs.max(1),
            file_timeout: Duration::from_millis(config.runtime.file_timeout_ms),
            marker_prefix: config.scanner.marker_prefix.clone(),
            strict_capabilities: config.registry.strict_capabilities,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.out_dir.join(&self.manifest_name)
    }
}

struct WriteJob {
    fragments: Vec<GeneratedFragment>,
    reply: oneshot::Sender<WriteResult<Vec<WriteRecord>>>,
}

enum FileStatus {
    Generated {
        records: Vec<WriteRecord>,
        warnings: Vec<RunError>,
    },
    ParseFailed(RunError),
    TimedOut(RunError),
}

struct FileResult {
    index: usize,
    status: FileStatus,
}

/// Everything a worker needs to process one file
#[derive(Clone)]
struct FileWorker {
    generator: CodeGenerator,
    provider: Arc<dyn AstProvider>,
    include_paths: Arc<Vec<PathBuf>>,
    timeout: Duration,
}

impl FileWorker {
    async fn process(
        self,
        index: usize,
        input: PathBuf,
        queue: mpsc::Sender<WriteJob>,
    ) -> RunResult<FileResult> {
        let span = file_span(&input);
        let path = input.clone();
        let FileWorker {
            generator,
            provider,
            include_paths,
            timeout,
        } = self;

        let work = tokio::task::spawn_blocking(move || -> Result<RunResult<FileOutput>, ParseFailure> {
            let _entered = span.enter();
            let tu = provider.parse(&path, &include_paths)?;
            for diagnostic in tu.diagnostics() {
                warn!(diagnostic = %diagnostic, "Front end warning");
            }
            Ok(generator.generate(&tu))
        });

        let output = match tokio::time::timeout(timeout, work).await {
            Err(_) => {
                let error = RunError::FileTimeout {
                    file: input,
                    timeout_ms: timeout.as_millis() as u64,
                };
                warn!(error = %error, "File abandoned");
                return Ok(FileResult {
                    index,
                    status: FileStatus::TimedOut(error),
                });
            }
            Ok(Err(join_error)) => {
                return Err(RunError::internal(format!(
                    "worker for '{}' failed: {}",
                    input.display(),
                    join_error
                )))
            }
            Ok(Ok(Err(failure))) => {
                let error = RunError::from(failure);
                warn!(error = %error, "Skipping unparseable file");
                return Ok(FileResult {
                    index,
                    status: FileStatus::ParseFailed(error),
                });
            }
            Ok(Ok(Ok(generated))) => generated?,
        };

        debug!(
            file = %input.display(),
            requests = output.requests,
            fragments = output.fragments.len(),
            "Generation finished, queueing batch"
        );

        let (reply, response) = oneshot::channel();
        queue
            .send(WriteJob {
                fragments: output.fragments,
                reply,
            })
            .await
            .map_err(|_| RunError::internal("writer queue closed"))?;
        let records = response
            .await
            .map_err(|_| RunError::internal("writer stopped before answering"))??;

        Ok(FileResult {
            index,
            status: FileStatus::Generated {
                records,
                warnings: output.warnings,
            },
        })
    }
}

/// Drives a whole run over a fixed plugin set
pub struct Pipeline {
    generator: CodeGenerator,
    provider: Arc<dyn AstProvider>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        registry: Arc<PluginRegistry>,
        provider: Arc<dyn AstProvider>,
        options: PipelineOptions,
    ) -> Self {
        let layout = Layout::new(
            options.layout,
            options.in_dir.clone(),
            options.default_extension.clone(),
        );
        let generator = CodeGenerator::new(registry, layout, options.marker_prefix.clone())
            .strict_capabilities(options.strict_capabilities);

        Self {
            generator,
            provider,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process `inputs` and write their outputs.
    ///
    /// Returns `Err` on the first fatal error; the manifest is then left as
    /// it was. Recoverable errors end up in the report's warnings.
    #[instrument(skip_all, fields(files = inputs.len(), out_dir = %self.options.out_dir.display()))]
    pub async fn run(&self, inputs: &[PathBuf]) -> RunResult<RunReport> {
        let out_dir = self.options.out_dir.clone();
        std::fs::create_dir_all(&out_dir).map_err(|e| RunError::io(&out_dir, &e))?;

        let manifest_path = self.options.manifest_path();
        let previous = RunManifest::load(&manifest_path);

        let jobs = self.options.jobs.max(1);
        let (queue, mut jobs_rx) = mpsc::channel::<WriteJob>(jobs * 2);
        let mut writer = EmissionWriter::new(out_dir.clone());
        let writer_task = tokio::task::spawn_blocking(move || {
            while let Some(job) = jobs_rx.blocking_recv() {
                let result = writer.write_batch(&job.fragments);
                // The file task may have been aborted after a fatal error
                let _ = job.reply.send(result);
            }
        });

        let worker = FileWorker {
            generator: self.generator.clone(),
            provider: self.provider.clone(),
            include_paths: Arc::new(self.options.include_paths.clone()),
            timeout: self.options.file_timeout,
        };
        let semaphore = Arc::new(Semaphore::new(jobs));
        let mut tasks = JoinSet::new();

        for (index, input) in inputs.iter().cloned().enumerate() {
            let worker = worker.clone();
            let semaphore = semaphore.clone();
            let queue = queue.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| RunError::internal("worker pool closed"))?;
                worker.process(index, input, queue).await
            });
        }
        drop(queue);

        let mut results: Vec<Option<FileResult>> = (0..inputs.len()).map(|_| None).collect();
        let mut fatal: Option<RunError> = None;

        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| RunError::internal(format!("file task failed: {}", e)));
            match result.and_then(|r| r) {
                Ok(file) => {
                    let index = file.index;
                    results[index] = Some(file);
                }
                Err(error) => {
                    if fatal.is_none() {
                        error!(error = %error, kind = error.kind(), "Fatal error, aborting run");
                        tasks.abort_all();
                        fatal = Some(error);
                    }
                }
            }
        }

        writer_task
            .await
            .map_err(|e| RunError::internal(format!("writer failed: {}", e)))?;

        if let Some(error) = fatal {
            return Err(error);
        }

        let report = self.finish(inputs, results, &previous, &manifest_path)?;
        info!(summary = %report.summary(), "Run finished");
        Ok(report)
    }

    fn finish(
        &self,
        inputs: &[PathBuf],
        results: Vec<Option<FileResult>>,
        previous: &RunManifest,
        manifest_path: &Path,
    ) -> RunResult<RunReport> {
        let layout = self.generator.layout();
        let mut report = RunReport {
            files_total: inputs.len(),
            ..RunReport::default()
        };
        let mut current = RunManifest::default();
        let mut regenerated: Vec<PathBuf> = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for (input, result) in inputs.iter().zip(results) {
            let rel = layout.source_rel_path(input);
            seen.insert(rel.clone());

            let Some(result) = result else {
                continue;
            };

            match result.status {
                FileStatus::Generated { records, warnings } => {
                    report.files_generated += 1;
                    for record in &records {
                        match record.status {
                            WriteStatus::Written => report.fragments_written += 1,
                            WriteStatus::Unchanged => report.fragments_unchanged += 1,
                        }
                        current.entries.push(ManifestEntry::from_record(&rel, record));
                    }
                    report.warnings.extend(warnings.iter().map(RunError::report));
                    regenerated.push(rel);
                }
                FileStatus::ParseFailed(error) => {
                    report.parse_failures += 1;
                    report.warnings.push(error.report());
                    current.entries.extend(previous.entries_for(&rel).cloned());
                }
                FileStatus::TimedOut(error) => {
                    report.warnings.push(error.report());
                    current.entries.extend(previous.entries_for(&rel).cloned());
                }
            }
        }

        // Inputs of earlier runs that were not part of this one
        current.entries.extend(
            previous
                .entries
                .iter()
                .filter(|entry| !seen.contains(&entry.input))
                .cloned(),
        );

        let regenerated_set: HashSet<&Path> = regenerated.iter().map(PathBuf::as_path).collect();
        let stale = previous.stale_outputs(&regenerated_set, &current);
        for output in &stale {
            let path = self.options.out_dir.join(output);
            if self.options.remove_stale {
                match std::fs::remove_file(&path) {
                    Ok(()) => info!(path = %path.display(), "Removed stale output"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(path = %path.display(), error = %e, "Cannot remove stale output"),
                }
            } else {
                warn!(path = %path.display(), "Stale output from a previous run");
                // Keep reporting it until it is removed
                current.entries.extend(
                    previous
                        .entries
                        .iter()
                        .filter(|entry| &entry.output == output)
                        .take(1)
                        .cloned(),
                );
            }
        }
        report.stale_outputs = stale;

        current.save(manifest_path)?;
        Ok(report)
    }
}
