//! Plugin registry
//!
//! Maps capability tags to the plugin strategies that serve them. The
//! registry is filled once at start-up, in command-line order, and is
//! read-only afterwards so workers can share it without locking.

use crate::error::{RegistryError, RegistryResult};
use crate::loader::{LoadedPlugin, PluginSource};
use flex_plugin_api::{
    CapabilityEntry, CapabilityTag, DeclKind, KindScope, PluginDescriptor, PluginSettings,
    INTERFACE_VERSION,
};
use libloading::Library;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// A plugin as held by the registry
pub struct RegisteredPlugin {
    descriptor: PluginDescriptor,
    source: PluginSource,
    /// Serializes calls into plugins that are not thread-safe
    lock: Option<Mutex<()>>,
}

impl RegisteredPlugin {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn source(&self) -> &PluginSource {
        &self.source
    }

    /// Run `f` as a call into this plugin, holding the plugin lock when the
    /// plugin did not declare itself thread-safe.
    pub fn invoke<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.lock {
            Some(lock) => {
                let _guard = lock.lock();
                f()
            }
            None => f(),
        }
    }
}

/// The strategy chosen for one (capability, declaration kind) pair
#[derive(Clone, Copy)]
pub struct Resolved<'r> {
    pub plugin: &'r RegisteredPlugin,
    pub entry: &'r CapabilityEntry,
}

/// One row of the `--list-plugins` listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityListing {
    pub tag: CapabilityTag,
    pub plugin: String,
    pub scope: KindScope,
}

#[derive(Debug, Clone)]
struct Claim {
    plugin: usize,
    entry: usize,
    scope: KindScope,
}

/// Registry of loaded plugins, keyed by capability tag
pub struct PluginRegistry {
    /// Plugins in load order
    plugins: Vec<RegisteredPlugin>,
    claims: HashMap<CapabilityTag, Vec<Claim>>,
    /// Explicit ordering for tags that several plugins may claim
    priority: HashMap<CapabilityTag, Vec<String>>,
    shut_down: bool,
    // Declared last: dropped after every descriptor that points into them.
    libraries: Vec<Library>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            claims: HashMap::new(),
            priority: HashMap::new(),
            shut_down: false,
            libraries: Vec::new(),
        }
    }

    /// Configure the order in which plugins win a shared capability.
    ///
    /// Must be called before the plugins are registered: a tag with a
    /// priority list may be claimed by several plugins, the earliest listed
    /// one wins.
    pub fn set_priority(&mut self, tag: impl Into<CapabilityTag>, plugins: Vec<String>) {
        let tag = tag.into();
        debug!(capability = %tag, order = ?plugins, "Set capability priority");
        self.priority.insert(tag, plugins);
    }

    /// Register a descriptor linked into the host
    pub fn register(&mut self, descriptor: PluginDescriptor) -> RegistryResult<()> {
        self.register_loaded(LoadedPlugin::builtin(descriptor))
    }

    /// Register a loaded plugin, taking ownership of its library.
    ///
    /// Fails without changing the registry when the plugin speaks another
    /// interface version, reuses an id, or claims a capability another plugin
    /// already serves for the same declaration kinds.
    pub fn register_loaded(&mut self, loaded: LoadedPlugin) -> RegistryResult<()> {
        let LoadedPlugin {
            descriptor,
            source,
            library,
        } = loaded;

        if descriptor.interface_version != INTERFACE_VERSION {
            return Err(RegistryError::IncompatiblePluginVersion {
                plugin: descriptor.id.clone(),
                expected: INTERFACE_VERSION,
                found: descriptor.interface_version,
            });
        }

        if self.plugin(&descriptor.id).is_some() {
            return Err(RegistryError::DuplicatePlugin {
                plugin: descriptor.id.clone(),
            });
        }

        let index = self.plugins.len();
        let mut claims = self.claims.clone();

        for (entry_index, entry) in descriptor.capabilities.iter().enumerate() {
            let existing = claims.entry(entry.tag.clone()).or_default();

            if entry.overrides {
                for claim in existing.iter_mut().filter(|claim| claim.plugin != index) {
                    claim.scope = claim.scope.difference(&entry.scope);
                }
                existing.retain(|claim| !claim.scope.is_empty());
                info!(
                    plugin = %descriptor.id,
                    capability = %entry.tag,
                    scope = %entry.scope,
                    "Capability overridden"
                );
            } else {
                for claim in existing.iter() {
                    let overlap = claim.scope.intersection(&entry.scope);
                    if overlap.is_empty() {
                        continue;
                    }

                    let first = self.owner_id(claim.plugin, &descriptor);
                    if !self.priority_decides(&entry.tag, first, &descriptor.id) {
                        return Err(RegistryError::duplicate_capability(
                            entry.tag.clone(),
                            overlap,
                            first,
                            descriptor.id.clone(),
                        ));
                    }
                }
            }

            existing.push(Claim {
                plugin: index,
                entry: entry_index,
                scope: entry.scope.clone(),
            });
        }

        info!(
            plugin = %descriptor.id,
            version = %descriptor.version,
            source = %source,
            capabilities = descriptor.capabilities.len(),
            "Registered plugin"
        );

        self.claims = claims;
        self.plugins.push(RegisteredPlugin {
            lock: (!descriptor.thread_safe).then(|| Mutex::new(())),
            descriptor,
            source,
        });
        if let Some(library) = library {
            self.libraries.push(library);
        }
        Ok(())
    }

    fn owner_id<'a>(&'a self, plugin: usize, pending: &'a PluginDescriptor) -> &'a str {
        self.plugins
            .get(plugin)
            .map(|p| p.id())
            .unwrap_or(pending.id.as_str())
    }

    /// Two overlapping claims are allowed when the priority list ranks at
    /// least one of them.
    fn priority_decides(&self, tag: &CapabilityTag, first: &str, second: &str) -> bool {
        self.priority
            .get(tag)
            .map(|order| order.iter().any(|id| id == first || id == second))
            .unwrap_or(false)
    }

    fn rank(&self, tag: &CapabilityTag, claim: &Claim) -> (usize, usize) {
        let listed = self.priority.get(tag).and_then(|order| {
            let id = self.plugins[claim.plugin].id();
            order.iter().position(|candidate| candidate == id)
        });
        (listed.unwrap_or(usize::MAX), claim.plugin)
    }

    fn best_claim<'c>(
        &self,
        tag: &CapabilityTag,
        candidates: impl Iterator<Item = &'c Claim>,
    ) -> Option<&'c Claim> {
        candidates.min_by_key(|claim| self.rank(tag, claim))
    }

    fn resolved(&self, claim: &Claim) -> Resolved<'_> {
        let plugin = &self.plugins[claim.plugin];
        Resolved {
            plugin,
            entry: &plugin.descriptor.capabilities[claim.entry],
        }
    }

    /// Resolve the plugin that owns a capability tag
    pub fn resolve(&self, tag: &CapabilityTag) -> RegistryResult<&PluginDescriptor> {
        let claims = self
            .claims
            .get(tag)
            .filter(|claims| !claims.is_empty())
            .ok_or_else(|| RegistryError::unknown_capability(tag.clone()))?;

        self.best_claim(tag, claims.iter())
            .map(|claim| &self.plugins[claim.plugin].descriptor)
            .ok_or_else(|| RegistryError::unknown_capability(tag.clone()))
    }

    /// Resolve the strategy serving `tag` for a declaration of `kind`
    pub fn resolve_for(&self, tag: &CapabilityTag, kind: DeclKind) -> RegistryResult<Resolved<'_>> {
        let claims = self
            .claims
            .get(tag)
            .filter(|claims| !claims.is_empty())
            .ok_or_else(|| RegistryError::unknown_capability(tag.clone()))?;

        let claim = self
            .best_claim(tag, claims.iter().filter(|claim| claim.scope.contains(kind)))
            .ok_or_else(|| RegistryError::UnsupportedKind {
                tag: tag.clone(),
                kind,
            })?;

        Ok(self.resolved(claim))
    }

    /// True when some plugin declares the tag
    pub fn provides(&self, tag: &CapabilityTag) -> bool {
        self.claims
            .get(tag)
            .map(|claims| !claims.is_empty())
            .unwrap_or(false)
    }

    /// Check that every tag in `required` resolves
    pub fn require<'t>(
        &self,
        required: impl IntoIterator<Item = &'t CapabilityTag>,
    ) -> RegistryResult<()> {
        for tag in required {
            self.resolve(tag)?;
        }
        Ok(())
    }

    /// Registered plugin by id
    pub fn plugin(&self, id: &str) -> Option<&RegisteredPlugin> {
        self.plugins.iter().find(|plugin| plugin.id() == id)
    }

    /// Registered plugins in load order
    pub fn plugins(&self) -> impl Iterator<Item = &RegisteredPlugin> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Effective capability claims, sorted by tag then load order
    pub fn capabilities(&self) -> Vec<CapabilityListing> {
        let sorted: BTreeMap<&CapabilityTag, &Vec<Claim>> = self.claims.iter().collect();
        sorted
            .into_iter()
            .flat_map(|(tag, claims)| {
                let mut claims: Vec<&Claim> = claims.iter().collect();
                claims.sort_by_key(|claim| self.rank(tag, claim));
                claims.into_iter().map(move |claim| CapabilityListing {
                    tag: tag.clone(),
                    plugin: self.plugins[claim.plugin].id().to_string(),
                    scope: claim.scope.clone(),
                })
            })
            .collect()
    }

    /// Call every plugin's load hook in load order.
    ///
    /// `settings` maps plugin ids to their configuration tables; plugins
    /// without an entry receive `null`.
    pub fn run_load_hooks(
        &self,
        settings: &HashMap<String, serde_json::Value>,
        output_dir: &Path,
    ) -> RegistryResult<()> {
        for plugin in &self.plugins {
            let Some(hook) = &plugin.descriptor.on_load else {
                continue;
            };

            let plugin_settings = PluginSettings {
                plugin_id: plugin.id().to_string(),
                values: settings
                    .get(plugin.id())
                    .cloned()
                    .unwrap_or(serde_json::Value::Null),
                output_dir: output_dir.to_path_buf(),
            };

            plugin
                .invoke(|| hook(&plugin_settings))
                .map_err(|e| RegistryError::load_hook_failed(plugin.id(), e.to_string()))?;
            debug!(plugin = %plugin.id(), "Plugin load hook completed");
        }
        Ok(())
    }

    /// Call every plugin's unload hook in reverse load order. Runs at most
    /// once; dropping the registry calls it too.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        for plugin in self.plugins.iter().rev() {
            if let Some(hook) = &plugin.descriptor.on_unload {
                plugin.invoke(|| hook());
                debug!(plugin = %plugin.id(), "Plugin unloaded");
            }
        }

        if !self.plugins.is_empty() {
            info!(plugins = self.plugins.len(), "Plugin registry shut down");
        }
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        if !self.shut_down && !self.plugins.is_empty() {
            warn!("Plugin registry dropped without shutdown, running unload hooks");
        }
        self.shutdown();
    }
}
