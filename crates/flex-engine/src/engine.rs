//! Code Generation Engine
//!
//! Drives the scanner over one translation unit, resolves each match to a
//! plugin strategy and collects the generated sections. Recoverable failures
//! are collected per file; a crashing strategy aborts the file with a fatal
//! error.

use crate::error::{RunError, RunResult};
use crate::layout::{GeneratedFragment, Layout, Section};
use flex_ast::{ScanMatch, Scanner};
use flex_plugin_api::{GenerationRequest, GenerationResult, TranslationUnit};
use flex_plugin_system::{PluginRegistry, RegistryError, Resolved};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Output of one translation unit
#[derive(Debug, Clone, Default)]
pub struct FileOutput {
    pub input: PathBuf,
    /// Fragments in scanner order
    pub fragments: Vec<GeneratedFragment>,
    /// Recoverable errors, in the order they happened
    pub warnings: Vec<RunError>,
    /// Number of generation requests submitted to plugins
    pub requests: usize,
}

/// Turns scanner matches into generated fragments
#[derive(Clone)]
pub struct CodeGenerator {
    registry: Arc<PluginRegistry>,
    layout: Layout,
    marker_prefix: String,
    strict_capabilities: bool,
}

impl CodeGenerator {
    pub fn new(registry: Arc<PluginRegistry>, layout: Layout, marker_prefix: impl Into<String>) -> Self {
        Self {
            registry,
            layout,
            marker_prefix: marker_prefix.into(),
            strict_capabilities: false,
        }
    }

    /// Make markers naming an unknown capability fatal
    pub fn strict_capabilities(mut self, strict: bool) -> Self {
        self.strict_capabilities = strict;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Generate every fragment of one parsed translation unit.
    ///
    /// Requests are processed in scanner order. Returns `Err` only for fatal
    /// errors; the file is then abandoned as a whole.
    #[instrument(skip(self, tu), fields(file = %tu.path().display()))]
    pub fn generate(&self, tu: &TranslationUnit) -> RunResult<FileOutput> {
        let input = tu.path();
        let scanner = Scanner::new(tu, self.marker_prefix.as_str());

        let mut sections = Vec::new();
        let mut warnings = Vec::new();
        let mut requests = 0;

        for scan_match in scanner.matches() {
            let resolved = match self
                .registry
                .resolve_for(scan_match.tag(), scan_match.declaration.kind())
            {
                Ok(resolved) => resolved,
                Err(RegistryError::UnknownCapability { tag }) => {
                    let location = scan_match.declaration.location().clone();
                    if self.strict_capabilities {
                        return Err(RunError::UnknownCapability {
                            tag,
                            location: Some(location),
                        });
                    }
                    warn!(
                        capability = %tag,
                        location = %location,
                        "No plugin provides this capability, skipping"
                    );
                    continue;
                }
                Err(error @ RegistryError::UnsupportedKind { .. }) => {
                    warnings.push(generation_error(&scan_match, "<none>", error.to_string()));
                    continue;
                }
                Err(error) => return Err(error.into()),
            };

            requests += 1;
            let output = self.invoke(resolved, &scan_match, tu)?;
            match output {
                Ok(codes) => {
                    debug!(
                        plugin = %resolved.plugin.id(),
                        capability = %scan_match.tag(),
                        declaration = %scan_match.declaration.qualified_name(),
                        blocks = codes.len(),
                        "Generated"
                    );
                    let descriptor = resolved.plugin.descriptor();
                    sections.extend(codes.into_iter().map(|code| Section {
                        plugin_id: descriptor.id.clone(),
                        plugin_version: descriptor.version.clone(),
                        capability: scan_match.tag().clone(),
                        declaration: scan_match.declaration.qualified_name().to_string(),
                        location: scan_match.declaration.location().clone(),
                        code,
                    }));
                }
                Err(error) => {
                    let error = generation_error(&scan_match, resolved.plugin.id(), error.to_string());
                    warn!(error = %error, "Generation failed, skipping fragment");
                    warnings.push(error);
                }
            }
        }

        let (fragments, layout_errors) = self.layout.assemble(input, sections);
        for error in &layout_errors {
            warn!(error = %error, "Unusable output location, skipping fragment");
        }
        warnings.extend(layout_errors);

        Ok(FileOutput {
            input: input.to_path_buf(),
            fragments,
            warnings,
            requests,
        })
    }

    /// Call a strategy, holding the plugin lock when required. A panic
    /// becomes a fatal `PluginCrash`.
    fn invoke(
        &self,
        resolved: Resolved<'_>,
        scan_match: &ScanMatch<'_>,
        tu: &TranslationUnit,
    ) -> RunResult<GenerationResult> {
        let request = GenerationRequest {
            declaration: scan_match.declaration,
            invocation: &scan_match.invocation,
            source_path: tu.path(),
            plugin_id: resolved.plugin.id(),
        };

        panic::catch_unwind(AssertUnwindSafe(|| {
            resolved.plugin.invoke(|| resolved.entry.generate(&request))
        }))
        .map_err(|payload| RunError::PluginCrash {
            plugin: resolved.plugin.id().to_string(),
            capability: scan_match.tag().clone(),
            declaration: scan_match.declaration.qualified_name().to_string(),
            location: scan_match.declaration.location().clone(),
            message: panic_message(payload.as_ref()),
        })
    }
}

fn generation_error(scan_match: &ScanMatch<'_>, plugin: &str, message: String) -> RunError {
    RunError::GenerationError {
        plugin: plugin.to_string(),
        capability: scan_match.tag().clone(),
        declaration: scan_match.declaration.qualified_name().to_string(),
        location: scan_match.declaration.location().clone(),
        message,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "plugin panicked".to_string()
    }
}
