//! Code generation engine for flextool
//!
//! - [`CodeGenerator`] turns the scanner matches of one translation unit into
//!   [`GeneratedFragment`]s by calling plugin strategies through the
//!   registry.
//! - [`Layout`] decides where each fragment lands and frames it with a
//!   deterministic header.
//! - [`EmissionWriter`] writes fragment batches atomically and skips files
//!   whose content did not change.
//! - [`RunManifest`] remembers what the last successful run produced.
//! - [`Pipeline`] runs all of the above over many files in parallel.

pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod layout;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod writer;

pub use engine::{CodeGenerator, FileOutput};
pub use error::{RunError, RunResult, Severity, WriteError, WriteResult};
pub use fingerprint::fingerprint;
pub use layout::{GeneratedFragment, Layout, Section};
pub use manifest::{ManifestEntry, RunManifest};
pub use pipeline::{Pipeline, PipelineOptions};
pub use report::{ErrorReport, Outcome, RunReport};
pub use writer::{EmissionWriter, WriteRecord, WriteStatus};
