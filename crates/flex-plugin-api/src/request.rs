//! Generation requests and their output

use crate::annotation::AnnotationInvocation;
use crate::capability::CapabilityTag;
use crate::declaration::DeclarationHandle;
use std::path::Path;

/// A (declaration, capability) pair submitted to one plugin.
///
/// Borrows the translation unit: a request cannot outlive the pass that
/// produced it.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'tu> {
    pub declaration: DeclarationHandle<'tu>,
    pub invocation: &'tu AnnotationInvocation,
    pub source_path: &'tu Path,
    pub plugin_id: &'tu str,
}

impl<'tu> GenerationRequest<'tu> {
    pub fn capability(&self) -> &'tu CapabilityTag {
        &self.invocation.tag
    }

    pub fn arg(&self, name: &str) -> Option<&'tu str> {
        self.invocation.arg(name)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.invocation.has_flag(flag)
    }
}

/// A block of generated source text returned by a strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub contents: String,
    /// Explicit output file name relative to the output directory
    pub file_name: Option<String>,
    /// Extension override for layout-derived file names
    pub extension: Option<String>,
}

impl GeneratedCode {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            file_name: None,
            extension: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into().trim_start_matches('.').to_string());
        self
    }
}
