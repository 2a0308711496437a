//! Core Plugin API for flextool code generation
//!
//! This crate defines the contract between the `flextool` host and the
//! plugins it loads. A plugin is described by a [`PluginDescriptor`]: a flat
//! table of capability tags (e.g. `enum-to-string`), each bound to a
//! generation strategy. The host hands every strategy a read-only
//! [`GenerationRequest`] borrowed from the translation unit being processed
//! and receives zero or more [`GeneratedCode`] blocks back.
//!
//! # Architecture
//!
//! - Layer 0: this crate has no dependency on the AST front end, the registry
//!   or the engine. Every other workspace crate depends on it.
//! - Built-in plugins self-register at link time with [`flex_plugin!`].
//! - Plugins shipped as shared modules export a [`PluginDeclaration`] with
//!   [`export_plugin!`]; the host checks [`INTERFACE_VERSION`] before use.

// ============================================================================
// Module Declarations
// ============================================================================

pub mod annotation;
pub mod capability;
pub mod declaration;
pub mod descriptor;
pub mod error;
pub mod export;
pub mod plugin_registry;
pub mod request;

// Re-exports
pub use annotation::{AnnotationArg, AnnotationInvocation, MarkerError};
pub use capability::{CapabilityEntry, CapabilityTag, GenerationResult, KindScope, Strategy};
pub use declaration::{
    Access, DeclDetail, DeclId, DeclKind, Declaration, DeclarationHandle, Diagnostic,
    DiagnosticSeverity, EnumInfo, Enumerator, FieldInfo, FunctionInfo, Param, RecordInfo,
    RecordTag, SourceLocation, TemplateParam, TemplateParamKind, TranslationUnit,
};
pub use descriptor::{LoadHook, PluginDescriptor, PluginMetadata, PluginSettings, UnloadHook};
pub use error::{GenerationError, PluginApiError, PluginResult};
pub use export::{PluginDeclaration, API_VERSION, DECLARATION_SYMBOL};
pub use plugin_registry::{find_builtin_plugin, iter_builtin_plugins, BuiltinPlugin};
pub use request::{GeneratedCode, GenerationRequest};

// Re-export inventory for the macro.
pub use inventory;

/// Version of the capability interface spoken between host and plugins.
///
/// Bump whenever [`PluginDescriptor`], [`GenerationRequest`] or the
/// declaration model change shape. The host refuses plugins built against a
/// different value.
pub const INTERFACE_VERSION: u32 = 1;
