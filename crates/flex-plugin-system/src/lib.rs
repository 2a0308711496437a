//! Plugin registry and loader for the flextool host
//!
//! Plugins arrive either linked into the host (`builtin:<id>`) or as shared
//! modules opened with `libloading`. Both end up as a [`PluginDescriptor`]
//! registered in a [`PluginRegistry`], which resolves capability tags to
//! strategies for the rest of the run.
//!
//! [`PluginDescriptor`]: flex_plugin_api::PluginDescriptor

pub mod error;
pub mod loader;
pub mod registry;

pub use error::{LoadError, LoadResult, RegistryError, RegistryResult};
pub use loader::{builtin_plugin_ids, load_builtin, load_library, load_plugin, LoadedPlugin, PluginSource};
pub use registry::{CapabilityListing, PluginRegistry, RegisteredPlugin, Resolved};
