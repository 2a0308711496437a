//! Plugin loader
//!
//! Turns a `--load_plugin` value into a [`LoadedPlugin`]. Two sources are
//! supported:
//!
//! - `builtin:<id>` selects a plugin linked into the host through
//!   `flex_plugin!`.
//! - A path to an existing shared module, which must export the
//!   `FLEX_PLUGIN_DECLARATION` static produced by `export_plugin!`.
//!
//! A value that is neither is tried once more as a built-in id, with the
//! platform's library prefix and suffix stripped, so build scripts that pass
//! `libflex_enum_plugin.so` keep working against a statically linked host.

use crate::error::{LoadError, LoadResult};
use flex_plugin_api::{
    find_builtin_plugin, iter_builtin_plugins, PluginDeclaration, PluginDescriptor, API_VERSION,
    DECLARATION_SYMBOL, INTERFACE_VERSION,
};
use libloading::Library;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BUILTIN_PREFIX: &str = "builtin:";

/// Where a plugin came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    Builtin,
    Library(PathBuf),
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("built-in"),
            Self::Library(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A descriptor together with the module that holds its code.
///
/// For shared modules the [`Library`] must stay open for as long as the
/// descriptor (or any strategy cloned from it) is alive.
pub struct LoadedPlugin {
    pub descriptor: PluginDescriptor,
    pub source: PluginSource,
    pub(crate) library: Option<Library>,
}

impl LoadedPlugin {
    pub fn builtin(descriptor: PluginDescriptor) -> Self {
        Self {
            descriptor,
            source: PluginSource::Builtin,
            library: None,
        }
    }
}

impl fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("descriptor", &self.descriptor)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Load one plugin named on the command line
pub fn load_plugin(spec: &str) -> LoadResult<LoadedPlugin> {
    if let Some(id) = spec.strip_prefix(BUILTIN_PREFIX) {
        return load_builtin(id);
    }

    let path = Path::new(spec);
    if path.is_file() {
        return load_library(path);
    }

    if let Some(id) = builtin_id_from_file_name(path) {
        if find_builtin_plugin(&id).is_some() {
            debug!(spec = %spec, plugin = %id, "No such file, using the built-in plugin");
            return load_builtin(&id);
        }
    }

    Err(LoadError::not_found(spec))
}

/// Instantiate a plugin linked into the host binary
pub fn load_builtin(id: &str) -> LoadResult<LoadedPlugin> {
    let plugin = find_builtin_plugin(id).ok_or_else(|| LoadError::UnknownBuiltin {
        id: id.to_string(),
        available: builtin_plugin_ids(),
    })?;

    let descriptor = (plugin.entry)();
    debug!(plugin = %descriptor.id, version = %descriptor.version, "Loaded built-in plugin");
    Ok(LoadedPlugin::builtin(descriptor))
}

/// Ids of all plugins linked into the host, sorted
pub fn builtin_plugin_ids() -> Vec<String> {
    let mut ids: Vec<String> = iter_builtin_plugins()
        .map(|plugin| plugin.id.to_string())
        .collect();
    ids.sort();
    ids
}

/// Open a shared module and read its plugin declaration.
///
/// The interface version is checked before the entry point is called, so a
/// module built against an older contract never runs any code.
pub fn load_library(path: &Path) -> LoadResult<LoadedPlugin> {
    let location = path.display().to_string();

    let library = unsafe { Library::new(path) }
        .map_err(|e| LoadError::library_load(location.clone(), e.to_string()))?;

    let declaration: PluginDeclaration = unsafe {
        let symbol = library
            .get::<*const PluginDeclaration>(DECLARATION_SYMBOL)
            .map_err(|e| LoadError::SymbolNotFound {
                path: location.clone(),
                symbol: String::from_utf8_lossy(&DECLARATION_SYMBOL[..DECLARATION_SYMBOL.len() - 1])
                    .into_owned(),
                message: e.to_string(),
            })?;
        (*symbol).read()
    };

    check_declaration(&location, &declaration)?;

    let descriptor = (declaration.entry)();
    info!(
        plugin = %descriptor.id,
        version = %descriptor.version,
        path = %location,
        "Loaded plugin library"
    );

    Ok(LoadedPlugin {
        descriptor,
        source: PluginSource::Library(path.to_path_buf()),
        library: Some(library),
    })
}

fn check_declaration(plugin: &str, declaration: &PluginDeclaration) -> LoadResult<()> {
    if declaration.interface_version != INTERFACE_VERSION {
        return Err(LoadError::IncompatiblePluginVersion {
            plugin: plugin.to_string(),
            expected: INTERFACE_VERSION,
            found: declaration.interface_version,
        });
    }

    if !is_compatible_api_version(declaration.api_version) {
        return Err(LoadError::IncompatibleApiVersion {
            plugin: plugin.to_string(),
            expected: API_VERSION.to_string(),
            found: declaration.api_version.to_string(),
        });
    }

    Ok(())
}

/// Major and minor must match the host's plugin API version
fn is_compatible_api_version(plugin_version: &str) -> bool {
    let host_parts: Vec<&str> = API_VERSION.split('.').collect();
    let plugin_parts: Vec<&str> = plugin_version.split('.').collect();

    if host_parts.len() < 2 || plugin_parts.len() < 2 {
        return false;
    }

    host_parts[0] == plugin_parts[0] && host_parts[1] == plugin_parts[1]
}

/// `path/to/libflex_enum_plugin.so` -> `flex_enum_plugin`
fn builtin_id_from_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let stem = stem.strip_prefix("lib").unwrap_or(stem);
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}
