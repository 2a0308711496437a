//! Code Generation Plugin Bundle
//!
//! The single collection point for the plugins that ship inside the
//! `flextool` binary. The engine and the plugin system only know about
//! `flex-plugin-api`; this crate is what pulls concrete plugins into the
//! final link so their `flex_plugin!` registrations are visible.

use flex_plugin_api::{iter_builtin_plugins, BuiltinPlugin, PluginDescriptor};

// Reference each plugin's entry point so the linker keeps the crates and
// their inventory submissions.
#[cfg(feature = "plugin-enum")]
use flex_enum_plugin::descriptor as enum_descriptor;
#[cfg(feature = "plugin-pimpl")]
use flex_pimpl_plugin::descriptor as pimpl_descriptor;
#[cfg(feature = "plugin-reflect")]
use flex_reflect_plugin::descriptor as reflect_descriptor;

fn force_plugin_linkage() {
    #[cfg(feature = "plugin-enum")]
    std::hint::black_box(enum_descriptor as fn() -> PluginDescriptor);
    #[cfg(feature = "plugin-reflect")]
    std::hint::black_box(reflect_descriptor as fn() -> PluginDescriptor);
    #[cfg(feature = "plugin-pimpl")]
    std::hint::black_box(pimpl_descriptor as fn() -> PluginDescriptor);
}

/// Returns every built-in plugin linked into this binary, sorted by id.
///
/// Plugins self-register with the `flex_plugin!` macro; this only walks the
/// inventory. The host decides which of them to instantiate.
///
/// ```no_run
/// let ids: Vec<&str> = flex_plugin_bundle::all_plugins()
///     .iter()
///     .map(|plugin| plugin.id)
///     .collect();
/// ```
pub fn all_plugins() -> Vec<&'static BuiltinPlugin> {
    force_plugin_linkage();

    let mut plugins: Vec<_> = iter_builtin_plugins()
        .inspect(|plugin| {
            tracing::debug!(plugin_id = plugin.id, "Discovered built-in plugin via inventory");
        })
        .collect();
    plugins.sort_by_key(|plugin| plugin.id);

    tracing::debug!(
        plugin_count = plugins.len(),
        "Built-in plugin bundle discovery complete"
    );

    plugins
}

/// Ids of the plugins enabled at compile time
pub fn enabled_plugin_ids() -> Vec<&'static str> {
    let mut ids = Vec::new();
    #[cfg(feature = "plugin-enum")]
    ids.push(flex_enum_plugin::PLUGIN_ID);
    #[cfg(feature = "plugin-pimpl")]
    ids.push(flex_pimpl_plugin::PLUGIN_ID);
    #[cfg(feature = "plugin-reflect")]
    ids.push(flex_reflect_plugin::PLUGIN_ID);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_enabled_plugins_are_discovered() {
        let discovered: Vec<&str> = all_plugins().iter().map(|plugin| plugin.id).collect();
        for id in enabled_plugin_ids() {
            assert!(discovered.contains(&id), "{} was not discovered", id);
        }
    }

    #[test]
    fn test_entries_match_their_ids() {
        for plugin in all_plugins() {
            let descriptor = (plugin.entry)();
            assert_eq!(descriptor.id, plugin.id);
            assert!(!descriptor.capabilities.is_empty());
        }
    }

    #[cfg(all(feature = "plugin-enum", feature = "plugin-pimpl", feature = "plugin-reflect"))]
    #[test]
    fn test_default_bundle() {
        let ids: Vec<&str> = all_plugins().iter().map(|plugin| plugin.id).collect();
        assert_eq!(
            ids,
            vec!["flex_enum_plugin", "flex_pimpl_plugin", "flex_reflect_plugin"]
        );
    }
}
