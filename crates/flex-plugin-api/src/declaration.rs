//! Read-only declaration model handed to plugins
//!
//! A [`TranslationUnit`] owns an arena of [`Declaration`]s in source order.
//! Plugins never see the arena directly: they receive a
//! [`DeclarationHandle`], a copyable non-owning reference that borrows the
//! translation unit and therefore cannot outlive the processing pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Core Data Types
// ============================================================================

/// Kind of a declaration the scanner can yield
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclKind {
    Enum,
    Class,
    Struct,
    Union,
    Function,
    Method,
    Field,
}

impl DeclKind {
    pub const ALL: [DeclKind; 7] = [
        DeclKind::Enum,
        DeclKind::Class,
        DeclKind::Struct,
        DeclKind::Union,
        DeclKind::Function,
        DeclKind::Method,
        DeclKind::Field,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Enum => "enum",
            DeclKind::Class => "class",
            DeclKind::Struct => "struct",
            DeclKind::Union => "union",
            DeclKind::Function => "function",
            DeclKind::Method => "method",
            DeclKind::Field => "field",
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, DeclKind::Class | DeclKind::Struct | DeclKind::Union)
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location in a source file (1-based line and column)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Member access of a declaration. Namespace-scope declarations are public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateParamKind {
    Type,
    NonType,
    Template,
}

/// A template parameter of the declaration, e.g. `typename impl = FooImpl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParam {
    pub kind: TemplateParamKind,
    pub name: String,
    pub default: Option<String>,
    pub is_pack: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordTag {
    Class,
    Struct,
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInfo {
    pub tag: RecordTag,
    pub bases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    /// Initializer expression text, if written
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumInfo {
    /// `enum class` / `enum struct`
    pub scoped: bool,
    pub underlying: Option<String>,
    pub enumerators: Vec<Enumerator>,
}

/// A function or method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter type with the name removed, e.g. `const int&`
    pub type_name: String,
    /// Parameter name (empty when unnamed)
    pub name: String,
    /// The declaration as written without its default, e.g. `const int& arg2`
    pub full: String,
    /// Default argument text, if any
    pub default_value: Option<String>,
    pub is_rvalue_ref: bool,
    /// Passed by value and not a builtin, pointer or reference type
    pub is_by_value_class: bool,
    /// Function parameter pack, `Args&&... args`
    #[serde(default)]
    pub is_pack: bool,
}

impl Param {
    /// Whether a forwarding call should wrap this parameter in `std::move`.
    pub fn needs_move(&self) -> bool {
        self.is_rvalue_ref || self.is_by_value_class
    }

    /// Pack element type of a forwarding reference pack: `Args&&...` -> `Args`
    pub fn pack_type(&self) -> Option<&str> {
        if !self.is_pack || !self.is_rvalue_ref {
            return None;
        }
        let element = self
            .type_name
            .trim_end()
            .trim_end_matches("...")
            .trim_end()
            .strip_suffix("&&")?
            .trim();
        (!element.is_empty()).then_some(element)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub return_type: Option<String>,
    pub params: Vec<Param>,
    pub is_const: bool,
    pub is_noexcept: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_constexpr: bool,
    pub is_explicit: bool,
    pub is_ctor: bool,
    pub is_dtor: bool,
    pub is_operator: bool,
    /// Has a body at this location
    pub is_definition: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub type_name: String,
    pub is_static: bool,
}

/// Kind-specific payload of a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclDetail {
    Record(RecordInfo),
    Enum(EnumInfo),
    Function(FunctionInfo),
    Field(FieldInfo),
}

/// Index of a declaration inside its translation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeclId(pub usize);

/// A declaration extracted by the AST provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    pub qualified_name: String,
    /// Enclosing namespaces, outermost first
    pub namespaces: Vec<String>,
    /// Enclosing classes/structs, outermost first
    pub enclosing_records: Vec<String>,
    pub location: SourceLocation,
    /// Annotation tokens in source order
    pub annotations: Vec<String>,
    pub template_params: Vec<TemplateParam>,
    pub access: Access,
    pub parent: Option<DeclId>,
    pub children: Vec<DeclId>,
    pub detail: DeclDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

/// A front-end diagnostic attached to a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            location,
        }
    }

    pub fn warning(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
            location,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Error => "error",
        };
        match &self.location {
            Some(location) => write!(f, "{}: {}: {}", location, severity, self.message),
            None => write!(f, "{}: {}", severity, self.message),
        }
    }
}

// ============================================================================
// Translation Unit
// ============================================================================

/// One successfully parsed source file and its declaration arena.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationUnit {
    path: PathBuf,
    include_paths: Vec<PathBuf>,
    decls: Vec<Declaration>,
    diagnostics: Vec<Diagnostic>,
}

impl TranslationUnit {
    pub fn new(path: impl Into<PathBuf>, include_paths: Vec<PathBuf>) -> Self {
        Self {
            path: path.into(),
            include_paths,
            decls: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    /// Non-fatal diagnostics collected while parsing
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Append a declaration, linking it under its parent if it has one.
    pub fn push(&mut self, decl: Declaration) -> DeclId {
        let id = DeclId(self.decls.len());
        if let Some(parent) = decl.parent {
            if let Some(parent_decl) = self.decls.get_mut(parent.0) {
                parent_decl.children.push(id);
            }
        }
        self.decls.push(decl);
        id
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn get(&self, id: DeclId) -> Option<DeclarationHandle<'_>> {
        (id.0 < self.decls.len()).then_some(DeclarationHandle { tu: self, id })
    }

    /// All declarations in source order (parents before their members).
    pub fn declarations(&self) -> impl Iterator<Item = DeclarationHandle<'_>> + '_ {
        (0..self.decls.len()).map(move |index| DeclarationHandle {
            tu: self,
            id: DeclId(index),
        })
    }

    /// Find a class, struct or union by qualified name. A leading `::` is
    /// ignored; an unqualified name matches when it is unique.
    pub fn find_record(&self, name: &str) -> Option<DeclarationHandle<'_>> {
        let wanted = name.trim().trim_start_matches("::");
        let mut records = self.declarations().filter(|decl| decl.kind().is_record());

        if wanted.contains("::") {
            return records.find(|decl| decl.qualified_name() == wanted);
        }

        let candidates: Vec<_> = records.filter(|decl| decl.name() == wanted).collect();
        match candidates.as_slice() {
            [only] => Some(*only),
            _ => candidates
                .into_iter()
                .find(|decl| decl.qualified_name() == wanted),
        }
    }
}

// ============================================================================
// Declaration Handle
// ============================================================================

/// Non-owning, copyable reference to a declaration of a translation unit.
#[derive(Clone, Copy)]
pub struct DeclarationHandle<'tu> {
    tu: &'tu TranslationUnit,
    id: DeclId,
}

impl<'tu> DeclarationHandle<'tu> {
    fn decl(&self) -> &'tu Declaration {
        &self.tu.decls[self.id.0]
    }

    pub fn id(&self) -> DeclId {
        self.id
    }

    pub fn translation_unit(&self) -> &'tu TranslationUnit {
        self.tu
    }

    pub fn declaration(&self) -> &'tu Declaration {
        self.decl()
    }

    pub fn kind(&self) -> DeclKind {
        self.decl().kind
    }

    pub fn name(&self) -> &'tu str {
        &self.decl().name
    }

    pub fn qualified_name(&self) -> &'tu str {
        &self.decl().qualified_name
    }

    pub fn namespaces(&self) -> &'tu [String] {
        &self.decl().namespaces
    }

    pub fn location(&self) -> &'tu SourceLocation {
        &self.decl().location
    }

    pub fn annotations(&self) -> &'tu [String] {
        &self.decl().annotations
    }

    /// Whether any annotation token starts with `prefix`.
    pub fn has_annotation(&self, prefix: &str) -> bool {
        self.annotations().iter().any(|token| token.starts_with(prefix))
    }

    pub fn template_params(&self) -> &'tu [TemplateParam] {
        &self.decl().template_params
    }

    pub fn template_param(&self, name: &str) -> Option<&'tu TemplateParam> {
        self.template_params().iter().find(|param| param.name == name)
    }

    pub fn is_template(&self) -> bool {
        !self.decl().template_params.is_empty()
    }

    pub fn access(&self) -> Access {
        self.decl().access
    }

    pub fn parent(&self) -> Option<DeclarationHandle<'tu>> {
        self.decl().parent.and_then(|id| self.tu.get(id))
    }

    pub fn children(&self) -> impl Iterator<Item = DeclarationHandle<'tu>> + 'tu {
        let tu = self.tu;
        self.decl()
            .children
            .iter()
            .map(move |id| DeclarationHandle { tu, id: *id })
    }

    pub fn fields(&self) -> impl Iterator<Item = DeclarationHandle<'tu>> + 'tu {
        self.children().filter(|child| child.kind() == DeclKind::Field)
    }

    pub fn methods(&self) -> impl Iterator<Item = DeclarationHandle<'tu>> + 'tu {
        self.children().filter(|child| child.kind() == DeclKind::Method)
    }

    pub fn record(&self) -> Option<&'tu RecordInfo> {
        match &self.decl().detail {
            DeclDetail::Record(info) => Some(info),
            _ => None,
        }
    }

    pub fn enumeration(&self) -> Option<&'tu EnumInfo> {
        match &self.decl().detail {
            DeclDetail::Enum(info) => Some(info),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<&'tu FunctionInfo> {
        match &self.decl().detail {
            DeclDetail::Function(info) => Some(info),
            _ => None,
        }
    }

    pub fn field(&self) -> Option<&'tu FieldInfo> {
        match &self.decl().detail {
            DeclDetail::Field(info) => Some(info),
            _ => None,
        }
    }
}

impl fmt::Debug for DeclarationHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarationHandle")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("qualified_name", &self.qualified_name())
            .finish()
    }
}

impl PartialEq for DeclarationHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tu, other.tu) && self.id == other.id
    }
}

impl Eq for DeclarationHandle<'_> {}
