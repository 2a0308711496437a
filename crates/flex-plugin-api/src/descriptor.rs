//! Plugin descriptors and lifecycle hooks

use crate::capability::{CapabilityEntry, CapabilityTag};
use crate::error::PluginResult;
use crate::INTERFACE_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Called once after registration with the plugin's settings
pub type LoadHook = Arc<dyn Fn(&PluginSettings) -> PluginResult<()> + Send + Sync>;

/// Called at host shutdown, in reverse load order
pub type UnloadHook = Arc<dyn Fn() + Send + Sync>;

/// Human-facing information about a plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub title: String,
    pub author: String,
    pub description: String,
}

/// Settings handed to a plugin's load hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSettings {
    pub plugin_id: String,
    /// The plugin's table from `plugins.settings.<id>` (`Null` when absent)
    pub values: serde_json::Value,
    /// Output directory of the current run
    pub output_dir: PathBuf,
}

impl PluginSettings {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|value| value.as_str())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(|value| value.as_bool())
    }
}

/// Describes a code generation plugin to the host.
///
/// Created once at load time by the plugin's entry point and immutable
/// afterwards. The capability table is the only way the host reaches plugin
/// code: each tag maps to exactly one strategy.
#[derive(Clone)]
pub struct PluginDescriptor {
    pub id: String,
    pub version: String,
    pub metadata: PluginMetadata,
    /// Capability interface the plugin was built against
    pub interface_version: u32,
    /// Strategies may be called concurrently from several workers
    pub thread_safe: bool,
    pub capabilities: Vec<CapabilityEntry>,
    pub on_load: Option<LoadHook>,
    pub on_unload: Option<UnloadHook>,
}

impl PluginDescriptor {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            metadata: PluginMetadata::default(),
            interface_version: INTERFACE_VERSION,
            thread_safe: false,
            capabilities: Vec::new(),
            on_load: None,
            on_unload: None,
        }
    }

    pub fn with_metadata(
        mut self,
        title: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.metadata = PluginMetadata {
            title: title.into(),
            author: author.into(),
            description: description.into(),
        };
        self
    }

    pub fn with_interface_version(mut self, version: u32) -> Self {
        self.interface_version = version;
        self
    }

    pub fn thread_safe(mut self, thread_safe: bool) -> Self {
        self.thread_safe = thread_safe;
        self
    }

    pub fn with_capability(mut self, entry: CapabilityEntry) -> Self {
        self.capabilities.push(entry);
        self
    }

    pub fn on_load<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PluginSettings) -> PluginResult<()> + Send + Sync + 'static,
    {
        self.on_load = Some(Arc::new(hook));
        self
    }

    pub fn on_unload<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_unload = Some(Arc::new(hook));
        self
    }

    /// Capability tags in declaration order, without duplicates
    pub fn capability_tags(&self) -> Vec<&CapabilityTag> {
        let mut tags: Vec<&CapabilityTag> = Vec::new();
        for entry in &self.capabilities {
            if !tags.contains(&&entry.tag) {
                tags.push(&entry.tag);
            }
        }
        tags
    }

    pub fn handles(&self, tag: &CapabilityTag) -> bool {
        self.capabilities.iter().any(|entry| &entry.tag == tag)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("interface_version", &self.interface_version)
            .field("thread_safe", &self.thread_safe)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::KindScope;
    use crate::declaration::DeclKind;

    #[test]
    fn test_builder_defaults() {
        let descriptor = PluginDescriptor::new("demo", "1.0.0")
            .with_capability(CapabilityEntry::new(
                "enum_to_string",
                KindScope::only([DeclKind::Enum]),
                |_| Ok(vec![]),
            ))
            .with_capability(CapabilityEntry::new(
                "enum-to-string",
                KindScope::only([DeclKind::Class]),
                |_| Ok(vec![]),
            ));

        assert_eq!(descriptor.interface_version, INTERFACE_VERSION);
        assert!(!descriptor.thread_safe);
        assert_eq!(descriptor.capability_tags().len(), 1);
        assert!(descriptor.handles(&CapabilityTag::new("enum-to-string")));
    }

    #[test]
    fn test_settings_accessors() {
        let settings = PluginSettings {
            plugin_id: "demo".to_string(),
            values: serde_json::json!({ "outDir": "gen", "verbose": true }),
            output_dir: PathBuf::from("out"),
        };
        assert_eq!(settings.get_str("outDir"), Some("gen"));
        assert_eq!(settings.get_bool("verbose"), Some(true));
        assert_eq!(settings.get_str("missing"), None);
    }
}
