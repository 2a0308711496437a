//! Error types shared between the host and plugins

use thiserror::Error;

/// Result type for plugin lifecycle operations
pub type PluginResult<T> = Result<T, PluginApiError>;

/// Errors raised by plugin lifecycle hooks (load, settings)
#[derive(Debug, Clone, Error)]
pub enum PluginApiError {
    /// The settings table handed to the plugin could not be used
    #[error("Invalid plugin settings: {message}")]
    InvalidSettings { message: String },

    /// Internal plugin error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PluginApiError {
    /// Create an invalid settings error
    pub fn invalid_settings(message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Recoverable failure reported by a generation strategy.
///
/// The engine logs it, drops the affected fragment and moves on to the next
/// request. A strategy that panics is treated very differently: see the
/// engine's `PluginCrash`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The declaration has a shape the strategy cannot handle
    #[error("Unsupported declaration: {message}")]
    Unsupported { message: String },

    /// The annotation arguments are malformed or unknown
    #[error("Invalid annotation input: {message}")]
    InvalidInput { message: String },

    /// A declaration the strategy depends on is not in the translation unit
    #[error("Missing context: {message}")]
    MissingContext { message: String },

    /// Internal plugin error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GenerationError {
    /// Create an unsupported declaration error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a missing context error
    pub fn missing_context(message: impl Into<String>) -> Self {
        Self::MissingContext {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
