//! Plugin system error types

use flex_plugin_api::{CapabilityTag, DeclKind, KindScope};
use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for plugin loading
pub type LoadResult<T> = Result<T, LoadError>;

/// Registry-level configuration errors.
///
/// All of these indicate a broken plugin set and are raised before any input
/// file is opened.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// The descriptor was built against another capability interface
    #[error("Plugin '{plugin}' speaks capability interface {found}, host expects {expected}")]
    IncompatiblePluginVersion {
        plugin: String,
        expected: u32,
        found: u32,
    },

    /// The same plugin id was loaded twice
    #[error("Plugin '{plugin}' is already registered")]
    DuplicatePlugin { plugin: String },

    /// Two plugins claim one tag for overlapping declaration kinds
    #[error(
        "Capability '{tag}' is claimed by both '{first}' and '{second}' for kinds {scope}; \
         mark one claim as an override or configure registry.priority"
    )]
    DuplicateCapability {
        tag: CapabilityTag,
        scope: KindScope,
        first: String,
        second: String,
    },

    /// No loaded plugin declares the tag
    #[error("No loaded plugin provides capability '{tag}'")]
    UnknownCapability { tag: CapabilityTag },

    /// The tag is known, but no claim covers this declaration kind
    #[error("Capability '{tag}' does not support {kind} declarations")]
    UnsupportedKind { tag: CapabilityTag, kind: DeclKind },

    /// A plugin's load hook rejected its settings
    #[error("Plugin '{plugin}' failed to load: {message}")]
    LoadHookFailed { plugin: String, message: String },
}

impl RegistryError {
    /// Create a duplicate capability error
    pub fn duplicate_capability(
        tag: CapabilityTag,
        scope: KindScope,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::DuplicateCapability {
            tag,
            scope,
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create an unknown capability error
    pub fn unknown_capability(tag: impl Into<CapabilityTag>) -> Self {
        Self::UnknownCapability { tag: tag.into() }
    }

    /// Create a load hook error
    pub fn load_hook_failed(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadHookFailed {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while turning a `--load_plugin` value into a descriptor
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    /// The module's declaration names another capability interface
    #[error("Plugin '{plugin}' speaks capability interface {found}, host expects {expected} (plugin must be rebuilt)")]
    IncompatiblePluginVersion {
        plugin: String,
        expected: u32,
        found: u32,
    },

    /// The module was built against an incompatible plugin API crate
    #[error("Plugin '{plugin}' was built against plugin API {found}, host provides {expected}")]
    IncompatibleApiVersion {
        plugin: String,
        expected: String,
        found: String,
    },

    /// The shared module could not be opened
    #[error("Failed to load library '{path}': {message}")]
    LibraryLoad { path: String, message: String },

    /// The shared module does not export the plugin declaration
    #[error("Library '{path}' does not export '{symbol}': {message}")]
    SymbolNotFound {
        path: String,
        symbol: String,
        message: String,
    },

    /// `builtin:<id>` names a plugin that is not linked in
    #[error("Unknown built-in plugin '{id}' (available: {available:?})")]
    UnknownBuiltin { id: String, available: Vec<String> },

    /// The value is neither an existing file nor a built-in plugin
    #[error("Plugin '{spec}' not found: not a file and not a built-in plugin")]
    NotFound { spec: String },
}

impl LoadError {
    /// Create a library load error
    pub fn library_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LibraryLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(spec: impl Into<String>) -> Self {
        Self::NotFound { spec: spec.into() }
    }

    /// True for the interface version gate
    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, Self::IncompatiblePluginVersion { .. })
    }
}
