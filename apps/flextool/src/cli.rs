//! Command line interface of the flextool driver

use clap::{Parser, ValueEnum};
use flex_config::logging::level_from_verbosity;
use flex_config::{AppConfig, ConfigResult, OutputLayout};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The main CLI struct.
#[derive(Parser, Debug)]
#[command(name = "flextool")]
#[command(about = "Generates C++ code for annotated declarations using pluggable strategies")]
#[command(version)]
pub struct Cli {
    /// Directory generated files are written to [default: <indir>/generated]
    #[arg(long, value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    /// Base directory of the inputs [default: current directory]
    #[arg(long, value_name = "DIR")]
    pub indir: Option<PathBuf>,

    /// Plugin to load: a shared module path or `builtin:<id>` (repeatable).
    /// Without this flag every plugin linked into flextool is loaded.
    #[arg(long = "load_plugin", value_name = "PATH|builtin:ID")]
    pub load_plugin: Vec<String>,

    /// Compiler argument; `-I<dir>` adds an include path (repeatable)
    #[arg(long = "extra-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,

    /// Configuration file [default: flextool.toml or .flextool/config.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of files processed in parallel
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Wall-clock limit for processing one file
    #[arg(long = "timeout-ms", value_name = "N")]
    pub timeout_ms: Option<u64>,

    /// How generated fragments are grouped into files
    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,

    /// Format of error reports on stderr
    #[arg(long = "report-format", value_enum, default_value_t = ReportFormat::Human)]
    pub report_format: ReportFormat,

    /// Log level name (trace, debug, info, warn, error) or verbosity number
    #[arg(long = "log-level", value_name = "LEVEL", allow_hyphen_values = true)]
    pub log_level: Option<String>,

    /// Per-module verbosity, `module=N,...`
    #[arg(long, hide = true)]
    pub vmodule: Option<String>,

    /// Accepted for compatibility, logs always go to stderr
    #[arg(
        long = "enable-logging",
        hide = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "stderr"
    )]
    pub enable_logging: Option<String>,

    /// Print the loaded plugins and their capabilities, then exit
    #[arg(long = "list-plugins")]
    pub list_plugins: bool,

    /// Exit with code 2 when the run completed with warnings
    #[arg(long = "fail-on-warnings")]
    pub fail_on_warnings: bool,

    /// Source files to scan
    #[arg(required_unless_present = "list_plugins")]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    PerFile,
    PerDeclaration,
}

impl From<LayoutArg> for OutputLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::PerFile => OutputLayout::PerFile,
            LayoutArg::PerDeclaration => OutputLayout::PerDeclaration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Human,
    Json,
}

impl Cli {
    /// Configuration files and environment, then the flags on top
    pub fn load_config(&self, cwd: &Path) -> ConfigResult<AppConfig> {
        let mut config = AppConfig::load(cwd, self.config.as_deref())?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(level) = &self.log_level {
            config.logging.level = log_level(level);
        }
        if let Some(vmodule) = &self.vmodule {
            config.logging.directives.extend(vmodule_directives(vmodule));
        }
        if let Some(jobs) = self.jobs {
            config.runtime.jobs = jobs;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.runtime.file_timeout_ms = timeout_ms;
        }
        if let Some(layout) = self.layout {
            config.output.layout = layout.into();
        }
    }

    pub fn in_dir(&self, cwd: &Path) -> PathBuf {
        match &self.indir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        }
    }

    pub fn out_dir(&self, cwd: &Path, in_dir: &Path) -> PathBuf {
        match &self.outdir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => in_dir.join("generated"),
        }
    }
}

/// `2` -> `trace`, `WARN` -> `warn`
pub fn log_level(value: &str) -> String {
    match value.trim().parse::<i32>() {
        Ok(verbosity) => level_from_verbosity(verbosity).to_string(),
        Err(_) => value.trim().to_lowercase(),
    }
}

/// `flex_engine=2,flex_ast=0` -> `flex_engine=trace`, `flex_ast=info`
pub fn vmodule_directives(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once('=') {
            Some((module, level)) => format!("{}={}", module.trim(), log_level(level)),
            None => item.to_string(),
        })
        .collect()
}

/// Include paths from `-I<dir>` and split `-I <dir>` extra args
pub fn include_paths(extra_args: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut args = extra_args.iter();
    while let Some(arg) = args.next() {
        match arg.strip_prefix("-I") {
            Some("") => match args.next() {
                Some(path) => paths.push(PathBuf::from(path)),
                None => warn!("Ignoring trailing -I without a path"),
            },
            Some(path) => paths.push(PathBuf::from(path)),
            None => debug!(arg = %arg, "Ignoring extra argument"),
        }
    }
    paths
}

/// Relative inputs are taken from `in_dir`; repeated inputs are dropped
pub fn resolve_inputs(inputs: &[PathBuf], in_dir: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(inputs.len());
    for input in inputs {
        let path = if input.is_absolute() {
            input.clone()
        } else {
            in_dir.join(input)
        };
        if seen.insert(path.clone()) {
            resolved.push(path);
        } else {
            warn!(file = %path.display(), "Input listed more than once, processing it once");
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("flextool").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags() {
        let cli = parse(&[
            "--outdir",
            "gen",
            "--load_plugin",
            "builtin:flex_enum_plugin",
            "--load_plugin=libflex_pimpl_plugin.so",
            "--extra-arg=-Iinclude",
            "--extra-arg=-DNDEBUG",
            "--layout",
            "per-declaration",
            "--report-format",
            "json",
            "--log-level",
            "-1",
            "--enable-logging",
            "a.hpp",
            "b.hpp",
        ]);
        assert_eq!(cli.outdir, Some(PathBuf::from("gen")));
        assert_eq!(
            cli.load_plugin,
            vec!["builtin:flex_enum_plugin", "libflex_pimpl_plugin.so"]
        );
        assert_eq!(cli.extra_args, vec!["-Iinclude", "-DNDEBUG"]);
        assert_eq!(cli.layout, Some(LayoutArg::PerDeclaration));
        assert_eq!(cli.report_format, ReportFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("-1"));
        assert_eq!(cli.enable_logging.as_deref(), Some("stderr"));
        assert_eq!(cli.inputs.len(), 2);
    }

    #[test]
    fn test_inputs_required_unless_listing() {
        assert!(Cli::try_parse_from(["flextool"]).is_err());
        assert!(Cli::try_parse_from(["flextool", "--list-plugins"]).is_ok());
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&["--jobs", "3", "--timeout-ms", "250", "--log-level", "2", "x.hpp"]);
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.runtime.jobs, 3);
        assert_eq!(config.runtime.file_timeout_ms, 250);
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.output.layout, OutputLayout::PerFile);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(log_level("1"), "debug");
        assert_eq!(log_level("0"), "info");
        assert_eq!(log_level("-3"), "warn");
        assert_eq!(log_level("WARN"), "warn");
        assert_eq!(
            vmodule_directives("flex_engine=2, flex_ast=0,,"),
            vec!["flex_engine=trace", "flex_ast=info"]
        );
    }

    #[test]
    fn test_include_paths() {
        let args: Vec<String> = ["-Ia", "-I", "b", "-std=c++17", "-I"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            include_paths(&args),
            vec![PathBuf::from("a"), PathBuf::from("b")]
        );
    }

    #[test]
    fn test_directories() {
        let cwd = Path::new("/work");
        let cli = parse(&["--indir", "src", "x.hpp"]);
        let in_dir = cli.in_dir(cwd);
        assert_eq!(in_dir, PathBuf::from("/work/src"));
        assert_eq!(cli.out_dir(cwd, &in_dir), PathBuf::from("/work/src/generated"));

        let cli = parse(&["--outdir", "/tmp/gen", "x.hpp"]);
        assert_eq!(cli.out_dir(cwd, &cli.in_dir(cwd)), PathBuf::from("/tmp/gen"));
    }

    #[test]
    fn test_resolve_inputs_dedupes() {
        let inputs = vec![
            PathBuf::from("a.hpp"),
            PathBuf::from("/abs/b.hpp"),
            PathBuf::from("a.hpp"),
        ];
        assert_eq!(
            resolve_inputs(&inputs, Path::new("/src")),
            vec![PathBuf::from("/src/a.hpp"), PathBuf::from("/abs/b.hpp")]
        );
    }
}
