//! Run-level error taxonomy

use flex_ast::ParseFailure;
use flex_config::ConfigError;
use flex_plugin_api::{CapabilityTag, SourceLocation};
use flex_plugin_system::{LoadError, RegistryError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::report::ErrorReport;

/// Result type for the emission writer
pub type WriteResult<T> = Result<T, WriteError>;

/// Result type for pipeline operations
pub type RunResult<T> = Result<T, RunError>;

/// How an error affects the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recorded, the run continues
    Warning,
    /// The run stops with a non-zero exit code
    Fatal,
}

/// Errors raised by the emission writer
#[derive(Error, Debug, Clone)]
pub enum WriteError {
    /// Two fragments claim one output path in the same run
    #[error("Output '{}' is produced by both {first} and {second}", .path.display())]
    OutputCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("IO error on '{}': {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl WriteError {
    pub fn io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }
}

/// Every error a run can report, classified by [`RunError::severity`]
#[derive(Error, Debug, Clone)]
pub enum RunError {
    /// A file could not be parsed and was skipped
    #[error("Parse failure in '{}': {message}", .file.display())]
    ParseFailure {
        file: PathBuf,
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("Unknown capability '{tag}'")]
    UnknownCapability {
        tag: CapabilityTag,
        location: Option<SourceLocation>,
    },

    #[error("{message}")]
    DuplicateCapability { message: String },

    /// A strategy reported that it cannot handle a declaration
    #[error("Plugin '{plugin}' could not generate [{capability}] for '{declaration}': {message}")]
    GenerationError {
        plugin: String,
        capability: CapabilityTag,
        declaration: String,
        location: SourceLocation,
        message: String,
    },

    /// A strategy panicked; nothing the plugin does afterwards is trusted
    #[error("Plugin '{plugin}' crashed while generating [{capability}] for '{declaration}': {message}")]
    PluginCrash {
        plugin: String,
        capability: CapabilityTag,
        declaration: String,
        location: SourceLocation,
        message: String,
    },

    #[error("Output '{}' is produced by both {first} and {second}", .path.display())]
    OutputCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Plugin '{plugin}' speaks capability interface {found}, host expects {expected}")]
    IncompatiblePluginVersion {
        plugin: String,
        expected: u32,
        found: u32,
    },

    /// Processing one file took longer than the configured limit
    #[error("Processing '{}' exceeded {timeout_ms} ms and was abandoned", .file.display())]
    FileTimeout { file: PathBuf, timeout_ms: u64 },

    #[error("Plugin load failed: {message}")]
    PluginLoad { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error on '{}': {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RunError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }

    /// Stable name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ParseFailure { .. } => "ParseFailure",
            Self::UnknownCapability { .. } => "UnknownCapability",
            Self::DuplicateCapability { .. } => "DuplicateCapability",
            Self::GenerationError { .. } => "GenerationError",
            Self::PluginCrash { .. } => "PluginCrash",
            Self::OutputCollision { .. } => "OutputCollision",
            Self::IncompatiblePluginVersion { .. } => "IncompatiblePluginVersion",
            Self::FileTimeout { .. } => "FileTimeout",
            Self::PluginLoad { .. } => "PluginLoad",
            Self::Config { .. } => "Config",
            Self::Io { .. } => "Io",
            Self::Internal { .. } => "Internal",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::ParseFailure { .. } | Self::GenerationError { .. } | Self::FileTimeout { .. } => {
                Severity::Warning
            }
            _ => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    fn location(&self) -> (Option<PathBuf>, Option<&SourceLocation>) {
        match self {
            Self::ParseFailure { file, location, .. } => (Some(file.clone()), location.as_ref()),
            Self::UnknownCapability { location, .. } => {
                (location.as_ref().map(|l| l.file.clone()), location.as_ref())
            }
            Self::GenerationError { location, .. } | Self::PluginCrash { location, .. } => {
                (Some(location.file.clone()), Some(location))
            }
            Self::OutputCollision { path, .. } | Self::Io { path, .. } => (Some(path.clone()), None),
            Self::FileTimeout { file, .. } => (Some(file.clone()), None),
            _ => (None, None),
        }
    }

    /// Structured form for the end-of-run report
    pub fn report(&self) -> ErrorReport {
        let (file, location) = self.location();
        ErrorReport {
            kind: self.kind().to_string(),
            severity: self.severity(),
            message: self.to_string(),
            file,
            line: location.map(|l| l.line),
            column: location.map(|l| l.column),
        }
    }
}

impl From<ParseFailure> for RunError {
    fn from(failure: ParseFailure) -> Self {
        let message = failure
            .diagnostics
            .iter()
            .find(|d| d.is_fatal())
            .map(|d| d.message.clone())
            .unwrap_or_else(|| failure.to_string());
        RunError::ParseFailure {
            location: failure.first_location().cloned(),
            file: failure.file,
            message,
        }
    }
}

impl From<WriteError> for RunError {
    fn from(error: WriteError) -> Self {
        match error {
            WriteError::OutputCollision {
                path,
                first,
                second,
            } => RunError::OutputCollision {
                path,
                first,
                second,
            },
            WriteError::Io { path, message } => RunError::Io { path, message },
        }
    }
}

impl From<RegistryError> for RunError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::IncompatiblePluginVersion {
                plugin,
                expected,
                found,
            } => RunError::IncompatiblePluginVersion {
                plugin,
                expected,
                found,
            },
            RegistryError::UnknownCapability { tag } => RunError::UnknownCapability {
                tag,
                location: None,
            },
            RegistryError::DuplicateCapability { .. } | RegistryError::DuplicatePlugin { .. } => {
                RunError::DuplicateCapability {
                    message: error.to_string(),
                }
            }
            RegistryError::UnsupportedKind { .. } => RunError::config(error.to_string()),
            RegistryError::LoadHookFailed { .. } => RunError::PluginLoad {
                message: error.to_string(),
            },
        }
    }
}

impl From<LoadError> for RunError {
    fn from(error: LoadError) -> Self {
        match error {
            LoadError::IncompatiblePluginVersion {
                plugin,
                expected,
                found,
            } => RunError::IncompatiblePluginVersion {
                plugin,
                expected,
                found,
            },
            other => RunError::PluginLoad {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(error: ConfigError) -> Self {
        RunError::config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex_plugin_api::Diagnostic;

    #[test]
    fn test_severity_classification() {
        let timeout = RunError::FileTimeout {
            file: PathBuf::from("a.hpp"),
            timeout_ms: 10,
        };
        assert_eq!(timeout.severity(), Severity::Warning);

        let collision = RunError::OutputCollision {
            path: PathBuf::from("a.hpp.x.hpp"),
            first: "a".to_string(),
            second: "b".to_string(),
        };
        assert!(collision.is_fatal());
        assert!(RunError::config("bad").is_fatal());
    }

    #[test]
    fn test_parse_failure_report() {
        let location = SourceLocation {
            file: PathBuf::from("broken.hpp"),
            line: 3,
            column: 7,
        };
        let failure = ParseFailure::new(
            "broken.hpp",
            vec![Diagnostic::error("syntax error", Some(location))],
        );

        let report = RunError::from(failure).report();
        assert_eq!(report.kind, "ParseFailure");
        assert_eq!(report.severity, Severity::Warning);
        assert_eq!(report.file, Some(PathBuf::from("broken.hpp")));
        assert_eq!(report.line, Some(3));
        assert_eq!(report.column, Some(7));
    }

    #[test]
    fn test_registry_errors_map_to_taxonomy() {
        let error: RunError = RegistryError::unknown_capability("enum-to-json").into();
        assert_eq!(error.kind(), "UnknownCapability");
        assert!(error.is_fatal());

        let error: RunError = LoadError::IncompatiblePluginVersion {
            plugin: "old.so".to_string(),
            expected: 1,
            found: 7,
        }
        .into();
        assert_eq!(error.kind(), "IncompatiblePluginVersion");
    }
}
