//! Configuration management for flextool

pub mod logging;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker prefix of the flextool annotation convention
pub const DEFAULT_MARKER_PREFIX: &str = "{gen};{funccall};";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "FLEXTOOL__";

/// Config files looked up in the working directory, first match wins
pub const CONFIG_FILE_NAMES: [&str; 2] = ["flextool.toml", ".flextool/config.toml"];

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Figment error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Configuration file '{}' not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    /// Create an invalid configuration error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl From<ConfigError> for figment::Error {
    fn from(err: ConfigError) -> figment::Error {
        use figment::error::Kind;
        figment::Error::from(Kind::Message(err.to_string()))
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Annotation matching
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// Capability resolution
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Worker pool and timeouts
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Generated output layout
    #[serde(default)]
    pub output: OutputConfig,
    /// Per-plugin settings
    #[serde(default)]
    pub plugins: PluginsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, e.g. `flex_engine=trace`
    #[serde(default)]
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directives: Vec::new(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON logging
    Json,
    /// Human-readable pretty logging
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerConfig {
    /// Prefix that turns an annotation token into a generation marker
    pub marker_prefix: String,
    /// Accept annotation tokens written as comments above a declaration
    pub comment_markers: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            marker_prefix: DEFAULT_MARKER_PREFIX.to_string(),
            comment_markers: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Treat markers naming an unknown capability as fatal
    #[serde(default)]
    pub strict_capabilities: bool,
    /// Capabilities that must be provided by the loaded plugins
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    /// Capability tag -> plugin ids, highest priority first
    #[serde(default)]
    pub priority: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Number of files processed in parallel
    pub jobs: usize,
    /// Wall-clock limit for one file, in milliseconds
    pub file_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            file_timeout_ms: 60_000,
        }
    }
}

/// How fragments without an explicit file name are grouped into files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLayout {
    /// One file per (source file, capability tag)
    #[default]
    PerFile,
    /// One file per (declaration, capability tag)
    PerDeclaration,
}

impl std::str::FromStr for OutputLayout {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "per-file" => Ok(Self::PerFile),
            "per-declaration" => Ok(Self::PerDeclaration),
            other => Err(ConfigError::invalid(format!(
                "Unknown output layout '{}', must be one of: per-file, per-declaration",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    pub layout: OutputLayout,
    /// Extension of layout-derived file names, without the dot
    pub default_extension: String,
    /// Run manifest file name inside the output directory
    pub manifest_name: String,
    /// Delete outputs of the previous run that were not produced again
    pub remove_stale: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            layout: OutputLayout::PerFile,
            default_extension: "hpp".to_string(),
            manifest_name: ".flextool-manifest.json".to_string(),
            remove_stale: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginsConfig {
    /// Plugin id -> settings table handed to the plugin's load hook
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl AppConfig {
    /// Load configuration for a run started in `dir`.
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables (`FLEXTOOL__SECTION__KEY`)
    /// 2. `explicit` config file, or the first of [`CONFIG_FILE_NAMES`] in `dir`
    /// 3. Default values
    ///
    /// Command-line flags are applied on top by the caller.
    pub fn load(dir: &Path, explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                tracing::debug!(path = %path.display(), "Loading TOML configuration");
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = CONFIG_FILE_NAMES
                    .iter()
                    .map(|name| dir.join(name))
                    .find(|path| path.is_file())
                {
                    tracing::debug!(path = %path.display(), "Loading TOML configuration");
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .map(|key| env_key_path(key.as_str()).into())
                // `map` turns lowercasing back on
                .lowercase(false),
        );

        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::invalid(format!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                VALID_LEVELS.join(", ")
            )));
        }

        if self.runtime.jobs == 0 {
            return Err(ConfigError::invalid("runtime.jobs cannot be 0"));
        }

        if self.runtime.file_timeout_ms == 0 {
            return Err(ConfigError::invalid("runtime.fileTimeoutMs cannot be 0"));
        }

        if self.scanner.marker_prefix.trim().is_empty() {
            return Err(ConfigError::invalid("scanner.markerPrefix cannot be empty"));
        }

        if self.output.default_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::invalid("output.defaultExtension cannot be empty"));
        }

        if self.output.manifest_name.is_empty() || self.output.manifest_name.contains(['/', '\\']) {
            return Err(ConfigError::invalid(
                "output.manifestName must be a plain file name",
            ));
        }

        Ok(())
    }
}

/// `RUNTIME__FILE_TIMEOUT_MS` -> `runtime.fileTimeoutMs`
fn env_key_path(key: &str) -> String {
    key.split("__")
        .map(|segment| {
            let mut out = String::with_capacity(segment.len());
            let mut upper = false;
            for c in segment.chars() {
                if c == '_' {
                    upper = true;
                } else if upper {
                    out.extend(c.to_uppercase());
                    upper = false;
                } else {
                    out.extend(c.to_lowercase());
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.scanner.marker_prefix, DEFAULT_MARKER_PREFIX);
        assert!(config.scanner.comment_markers);
        assert_eq!(config.output.layout, OutputLayout::PerFile);
        assert_eq!(config.output.default_extension, "hpp");
        assert!(config.runtime.jobs >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_key_path() {
        assert_eq!(env_key_path("RUNTIME__FILE_TIMEOUT_MS"), "runtime.fileTimeoutMs");
        assert_eq!(env_key_path("runtime__file_timeout_ms"), "runtime.fileTimeoutMs");
        assert_eq!(env_key_path("LOGGING__LEVEL"), "logging.level");
    }

    #[test]
    fn test_load_no_file_uses_defaults() {
        Jail::expect_with(|jail| {
            let config = AppConfig::load(jail.directory(), None)?;
            assert_eq!(config, AppConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "flextool.toml",
                r#"
                [output]
                layout = "per-declaration"
                removeStale = true

                [registry]
                strictCapabilities = true
                priority = { "enum-to-string" = ["flex_enum_plugin"] }

                [plugins.settings.flex_pimpl_plugin]
                outDir = "gen"
                "#,
            )?;

            let config = AppConfig::load(jail.directory(), None)?;
            assert_eq!(config.output.layout, OutputLayout::PerDeclaration);
            assert!(config.output.remove_stale);
            // Default value should still be present
            assert_eq!(config.output.default_extension, "hpp");
            assert!(config.registry.strict_capabilities);
            assert_eq!(
                config.registry.priority.get("enum-to-string"),
                Some(&vec!["flex_enum_plugin".to_string()])
            );
            assert_eq!(
                config.plugins.settings["flex_pimpl_plugin"]["outDir"],
                serde_json::json!("gen")
            );
            Ok(())
        });
    }

    #[test]
    fn test_dot_directory_config() {
        Jail::expect_with(|jail| {
            jail.create_dir(".flextool")?;
            jail.create_file(".flextool/config.toml", "[runtime]\njobs = 3\n")?;

            let config = AppConfig::load(jail.directory(), None)?;
            assert_eq!(config.runtime.jobs, 3);
            Ok(())
        });
    }

    #[test]
    fn test_env_var_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("flextool.toml", "[runtime]\nfileTimeoutMs = 500\njobs = 2\n")?;
            jail.set_env("FLEXTOOL__RUNTIME__FILE_TIMEOUT_MS", "1500");
            jail.set_env("FLEXTOOL__LOGGING__LEVEL", "debug");

            let config = AppConfig::load(jail.directory(), None)?;
            assert_eq!(config.runtime.file_timeout_ms, 1500);
            assert_eq!(config.runtime.jobs, 2);
            assert_eq!(config.logging.level, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_env_vars_reach_multi_word_keys() {
        Jail::expect_with(|jail| {
            jail.set_env("FLEXTOOL__SCANNER__MARKER_PREFIX", "@gen:");
            jail.set_env("FLEXTOOL__SCANNER__COMMENT_MARKERS", "false");
            jail.set_env("FLEXTOOL__REGISTRY__STRICT_CAPABILITIES", "true");
            jail.set_env("FLEXTOOL__OUTPUT__DEFAULT_EXTENSION", "h");
            jail.set_env("FLEXTOOL__OUTPUT__MANIFEST_NAME", "runs.json");
            jail.set_env("FLEXTOOL__OUTPUT__REMOVE_STALE", "true");

            let config = AppConfig::load(jail.directory(), None)?;
            assert_eq!(config.scanner.marker_prefix, "@gen:");
            assert!(!config.scanner.comment_markers);
            assert!(config.registry.strict_capabilities);
            assert_eq!(config.output.default_extension, "h");
            assert_eq!(config.output.manifest_name, "runs.json");
            assert!(config.output.remove_stale);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_exist() {
        Jail::expect_with(|jail| {
            let missing = jail.directory().join("custom.toml");
            let result = AppConfig::load(jail.directory(), Some(&missing));
            assert!(matches!(result, Err(ConfigError::NotFound { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.runtime.jobs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scanner.marker_prefix = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.output.default_extension = ".".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("flextool.toml", "[runtime]\njobs = 0\n")?;
            let result = AppConfig::load(jail.directory(), None);
            assert!(matches!(result, Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("per-file".parse::<OutputLayout>().unwrap(), OutputLayout::PerFile);
        assert!("flat".parse::<OutputLayout>().is_err());
    }
}
