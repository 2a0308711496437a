//! Structured run reporting

use crate::error::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Serializable description of one error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Fatal => "error",
        };
        write!(f, "{}[{}]", severity, self.kind)?;
        if let Some(file) = &self.file {
            write!(f, " {}", file.display())?;
            if let (Some(line), Some(column)) = (self.line, self.column) {
                write!(f, ":{}:{}", line, column)?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

/// Overall result of a run that did not hit a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Success,
    CompletedWithWarnings,
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub files_total: usize,
    /// Files that went through generation (parsed and not timed out)
    pub files_generated: usize,
    pub parse_failures: usize,
    pub warnings: Vec<ErrorReport>,
    pub fragments_written: usize,
    pub fragments_unchanged: usize,
    /// Outputs of the previous run that this run no longer produces
    pub stale_outputs: Vec<PathBuf>,
}

impl RunReport {
    pub fn outcome(&self) -> Outcome {
        if self.warnings.is_empty() {
            Outcome::Success
        } else {
            Outcome::CompletedWithWarnings
        }
    }

    /// Fragments whose content differs from what was on disk
    pub fn changed(&self) -> usize {
        self.fragments_written
    }

    /// One-line summary for stderr
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} file(s), {} generated, {} written, {} unchanged",
            self.files_total, self.files_generated, self.fragments_written, self.fragments_unchanged
        );
        if self.parse_failures > 0 {
            summary.push_str(&format!(", {} parse failure(s)", self.parse_failures));
        }
        if !self.warnings.is_empty() {
            summary.push_str(&format!(", {} warning(s)", self.warnings.len()));
        }
        if !self.stale_outputs.is_empty() {
            summary.push_str(&format!(", {} stale output(s)", self.stale_outputs.len()));
        }
        summary
    }
}
