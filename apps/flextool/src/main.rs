mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, ReportFormat};
use flex_ast::CppAstProvider;
use flex_config::{logging, AppConfig};
use flex_engine::{ErrorReport, Outcome, Pipeline, PipelineOptions, RunError, RunReport, RunResult};
use flex_plugin_api::CapabilityTag;
use flex_plugin_system::{load_plugin, PluginRegistry};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const EXIT_FATAL: u8 = 1;
const EXIT_WARNINGS: u8 = 2;

/// Blocking workers abandoned after a timeout are not waited for longer
/// than this at exit
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("flextool: {:#}", error);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;

    let config = match cli.load_config(&cwd) {
        Ok(config) => config,
        Err(error) => return Ok(fatal(cli.report_format, &RunError::from(error))),
    };
    logging::initialize(&config);
    if let Some(target) = &cli.enable_logging {
        debug!(destination = %target, "--enable-logging is implied, logs go to stderr");
    }

    let mut registry = match build_registry(cli, &config) {
        Ok(registry) => registry,
        Err(error) => return Ok(fatal(cli.report_format, &error)),
    };

    if cli.list_plugins {
        print_plugins(&registry);
        registry.shutdown();
        return Ok(ExitCode::SUCCESS);
    }

    let in_dir = cli.in_dir(&cwd);
    let out_dir = cli.out_dir(&cwd, &in_dir);
    if let Err(error) = prepare_registry(&registry, &config, &out_dir) {
        registry.shutdown();
        return Ok(fatal(cli.report_format, &error));
    }

    let inputs = cli::resolve_inputs(&cli.inputs, &in_dir);
    let options = PipelineOptions::from_config(
        &config,
        out_dir,
        Some(in_dir),
        cli::include_paths(&cli.extra_args),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("flextool-worker")
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let registry = Arc::new(registry);
    let provider = Arc::new(CppAstProvider::new(config.scanner.comment_markers));
    let pipeline = Pipeline::new(registry.clone(), provider, options);
    let result = runtime.block_on(pipeline.run(&inputs));

    drop(pipeline);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    shutdown_plugins(registry);

    Ok(match result {
        Ok(report) => finish(cli, &report),
        Err(error) => fatal(cli.report_format, &error),
    })
}

/// Load and register plugins. Without `--load_plugin` every bundled plugin
/// is registered.
fn build_registry(cli: &Cli, config: &AppConfig) -> RunResult<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    for (tag, plugins) in &config.registry.priority {
        registry.set_priority(tag.as_str(), plugins.clone());
    }

    if cli.load_plugin.is_empty() {
        for plugin in flex_plugin_bundle::all_plugins() {
            registry.register((plugin.entry)())?;
        }
    } else {
        for spec in &cli.load_plugin {
            registry.register_loaded(load_plugin(spec)?)?;
        }
    }

    info!(plugins = registry.len(), "Plugins registered");
    Ok(registry)
}

/// Load hooks, then the required capability check
fn prepare_registry(registry: &PluginRegistry, config: &AppConfig, out_dir: &Path) -> RunResult<()> {
    registry.run_load_hooks(&config.plugins.settings, out_dir)?;

    if config.registry.strict_capabilities {
        let required: Vec<CapabilityTag> = config
            .registry
            .required_capabilities
            .iter()
            .map(CapabilityTag::new)
            .collect();
        registry.require(&required)?;
        debug!(required = required.len(), "Required capabilities are available");
    }
    Ok(())
}

fn shutdown_plugins(registry: Arc<PluginRegistry>) {
    match Arc::try_unwrap(registry) {
        Ok(mut registry) => registry.shutdown(),
        // abandoned workers still hold the registry
        Err(_) => warn!("Plugins still in use at exit, skipping unload hooks"),
    }
}

fn print_plugins(registry: &PluginRegistry) {
    for plugin in registry.plugins() {
        let descriptor = plugin.descriptor();
        println!(
            "{} {} ({})",
            descriptor.id,
            descriptor.version,
            plugin.source()
        );
        for entry in &descriptor.capabilities {
            println!("  {:<28} [{}]", entry.tag.to_string(), entry.scope);
        }
    }
}

fn finish(cli: &Cli, report: &RunReport) -> ExitCode {
    for warning in &report.warnings {
        print_report(cli.report_format, warning);
    }
    eprintln!("flextool: {}", report.summary());

    match report.outcome() {
        Outcome::CompletedWithWarnings if cli.fail_on_warnings => ExitCode::from(EXIT_WARNINGS),
        _ => ExitCode::SUCCESS,
    }
}

fn fatal(format: ReportFormat, error: &RunError) -> ExitCode {
    print_report(format, &error.report());
    eprintln!("flextool: aborted ({})", error.kind());
    ExitCode::from(EXIT_FATAL)
}

fn print_report(format: ReportFormat, report: &ErrorReport) {
    match format {
        ReportFormat::Human => eprintln!("{}", report),
        ReportFormat::Json => match serde_json::to_string(report) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", report),
        },
    }
}
