//! Link-time registration of built-in plugins

use crate::descriptor::PluginDescriptor;

/// A plugin compiled into the host binary.
///
/// Created by the `flex_plugin!` macro and collected at link-time by the
/// `inventory` crate. The entry point is only called when the plugin is
/// selected on the command line.
pub struct BuiltinPlugin {
    pub id: &'static str,
    pub entry: fn() -> PluginDescriptor,
}

// Collect all built-in plugins into a static collection.
inventory::collect!(BuiltinPlugin);

/// Returns an iterator over all built-in plugins linked into the binary.
pub fn iter_builtin_plugins() -> impl Iterator<Item = &'static BuiltinPlugin> {
    inventory::iter::<BuiltinPlugin>.into_iter()
}

/// Find a built-in plugin by id
pub fn find_builtin_plugin(id: &str) -> Option<&'static BuiltinPlugin> {
    iter_builtin_plugins().find(|plugin| plugin.id == id)
}

/// A macro for plugins to register themselves with the host binary.
///
/// ```ignore
/// flex_plugin! {
///     id: "flex_enum_plugin",
///     entry: descriptor
/// }
/// ```
#[macro_export]
macro_rules! flex_plugin {
    (
        id: $id:expr,
        entry: $entry:expr
    ) => {
        $crate::inventory::submit! {
            $crate::BuiltinPlugin {
                id: $id,
                entry: $entry,
            }
        }
    };
}
