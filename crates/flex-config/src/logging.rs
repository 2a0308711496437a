//! Centralized logging initialization with environment variable support

use crate::{AppConfig, LogFormat};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing subscriber with environment variable support
///
/// Environment variables (in priority order):
/// - `RUST_LOG`: Standard Rust log filter (takes precedence over all)
/// - `LOG_FORMAT`: Override format (json, pretty)
///
/// Logs always go to stderr; stdout is reserved for `--list-plugins` and
/// JSON reports.
///
/// # Examples
///
/// ```bash
/// # Module-specific filtering
/// RUST_LOG=flex_engine=debug,flex_ast=trace flextool --outdir gen foo.hpp
///
/// # Machine-readable logs
/// LOG_FORMAT=json flextool --outdir gen foo.hpp
/// ```
pub fn initialize(config: &AppConfig) {
    let log_level = config.logging.level.parse().unwrap_or(tracing::Level::INFO);

    // RUST_LOG takes precedence over config
    let mut env_filter = EnvFilter::from_default_env().add_directive(log_level.into());
    let mut rejected = Vec::new();
    for directive in &config.logging.directives {
        match directive.parse::<Directive>() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(_) => rejected.push(directive.clone()),
        }
    }

    let format = format_override(std::env::var("LOG_FORMAT").ok().as_deref())
        .unwrap_or(config.logging.format);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    for directive in rejected {
        tracing::warn!(directive = %directive, "Ignoring invalid log filter directive");
    }
}

fn format_override(value: Option<&str>) -> Option<LogFormat> {
    match value?.to_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "human" => Some(LogFormat::Pretty),
        _ => None,
    }
}

/// Map a verbosity number (`--log-level 2`) onto a level name.
///
/// Higher is chattier: 2 and above is `trace`, 1 `debug`, 0 `info`, negative
/// values `warn`.
pub fn level_from_verbosity(verbosity: i32) -> &'static str {
    match verbosity {
        v if v >= 2 => "trace",
        1 => "debug",
        0 => "info",
        _ => "warn",
    }
}

/// Translate `--vmodule=pattern=N,...` into `EnvFilter` directives.
///
/// Patterns name modules; glob characters and file extensions are dropped,
/// and dashes become underscores so `flex-engine=2` targets `flex_engine`.
pub fn vmodule_directives(vmodule: &str) -> Vec<String> {
    vmodule
        .split(',')
        .filter_map(|item| {
            let (pattern, level) = item.split_once('=')?;
            let verbosity: i32 = level.trim().parse().ok()?;
            let target: String = pattern
                .trim()
                .trim_end_matches(".rs")
                .chars()
                .filter(|c| *c != '*' && *c != '?')
                .map(|c| if c == '-' { '_' } else { c })
                .collect();
            if target.is_empty() {
                return None;
            }
            Some(format!("{}={}", target, level_from_verbosity(verbosity)))
        })
        .collect()
}

/// Create a span covering the processing of one input file
pub fn file_span(path: &std::path::Path) -> tracing::Span {
    tracing::info_span!("file", file = %path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_override() {
        assert_eq!(format_override(Some("JSON")), Some(LogFormat::Json));
        assert_eq!(format_override(Some("human")), Some(LogFormat::Pretty));
        assert_eq!(format_override(Some("xml")), None);
        assert_eq!(format_override(None), None);
    }

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(9), "trace");
        assert_eq!(level_from_verbosity(1), "debug");
        assert_eq!(level_from_verbosity(0), "info");
        assert_eq!(level_from_verbosity(-1), "warn");
    }

    #[test]
    fn test_vmodule_directives() {
        assert_eq!(
            vmodule_directives("*flex-engine*=2,walker.rs=1,bad,=3"),
            vec!["flex_engine=trace".to_string(), "walker=debug".to_string()]
        );
    }
}
