//! Entry point exported by plugins built as shared modules

use crate::descriptor::PluginDescriptor;

/// Version of this crate the plugin was compiled against. The host requires
/// the same major.minor.
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the static the host looks up in a shared module
pub const DECLARATION_SYMBOL: &[u8] = b"FLEX_PLUGIN_DECLARATION\0";

/// The single versioned entry point of a shared plugin module.
///
/// `interface_version` is the first field so the host can reject a module
/// before touching anything else.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    pub interface_version: u32,
    pub api_version: &'static str,
    pub entry: fn() -> PluginDescriptor,
}

/// Export a plugin entry point from a `cdylib` crate.
///
/// ```ignore
/// fn descriptor() -> PluginDescriptor { /* ... */ }
/// flex_plugin_api::export_plugin!(descriptor);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($entry:expr) => {
        #[doc(hidden)]
        #[no_mangle]
        pub static FLEX_PLUGIN_DECLARATION: $crate::PluginDeclaration = $crate::PluginDeclaration {
            interface_version: $crate::INTERFACE_VERSION,
            api_version: $crate::API_VERSION,
            entry: $entry,
        };
    };
}
