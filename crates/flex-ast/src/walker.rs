//! Lowering of a tree-sitter C++ syntax tree into the declaration model

use crate::attributes::{annotate_tokens, comment_token};
use flex_plugin_api::{
    Access, DeclDetail, DeclId, DeclKind, Declaration, Diagnostic, EnumInfo, Enumerator,
    FieldInfo, FunctionInfo, Param, RecordInfo, RecordTag, SourceLocation, TemplateParam,
    TemplateParamKind, TranslationUnit,
};
use std::path::Path;
use tree_sitter::Node;

const MAX_SYNTAX_DIAGNOSTICS: usize = 16;

/// Nodes whose contents never carry annotations of the enclosing declaration
const BODY_KINDS: &[&str] = &[
    "field_declaration_list",
    "enumerator_list",
    "compound_statement",
    "declaration_list",
    "parameter_list",
    "template_parameter_list",
];

const RECORD_KINDS: &[&str] = &["class_specifier", "struct_specifier", "union_specifier"];

/// Lexical context of the node being visited
#[derive(Debug, Clone)]
struct Scope {
    namespaces: Vec<String>,
    records: Vec<String>,
    parent: Option<DeclId>,
    record_name: Option<String>,
    access: Access,
}

impl Scope {
    fn root() -> Self {
        Self {
            namespaces: Vec::new(),
            records: Vec::new(),
            parent: None,
            record_name: None,
            access: Access::Public,
        }
    }

    fn qualify(&self, name: &str) -> String {
        self.namespaces
            .iter()
            .chain(self.records.iter())
            .map(String::as_str)
            .chain(std::iter::once(name))
            .collect::<Vec<_>>()
            .join("::")
    }
}

/// Template header wrapping the declaration being visited
#[derive(Clone)]
struct Template<'t> {
    outer: Node<'t>,
    params: Vec<TemplateParam>,
}

pub(crate) struct Walker<'a> {
    source: &'a [u8],
    file: &'a Path,
    comment_markers: bool,
    tu: TranslationUnit,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(source: &'a str, tu: TranslationUnit, file: &'a Path, comment_markers: bool) -> Self {
        Self {
            source: source.as_bytes(),
            file,
            comment_markers,
            tu,
        }
    }

    pub(crate) fn finish(self) -> TranslationUnit {
        self.tu
    }

    /// Fatal diagnostics for every `ERROR`/`MISSING` node under `root`.
    pub(crate) fn syntax_errors(&self, root: Node<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut pending = vec![root];

        while let Some(node) = pending.pop() {
            if diagnostics.len() >= MAX_SYNTAX_DIAGNOSTICS {
                break;
            }
            if node.is_missing() {
                diagnostics.push(Diagnostic::error(
                    format!("missing '{}'", node.kind()),
                    Some(self.location(node)),
                ));
            } else if node.is_error() {
                let snippet: String = self.text(node).chars().take(40).collect();
                diagnostics.push(Diagnostic::error(
                    format!("syntax error near '{}'", squash(&snippet)),
                    Some(self.location(node)),
                ));
            } else if node.has_error() {
                // reversed so errors come out in source order
                let mut kids = children(node);
                kids.reverse();
                pending.extend(kids);
            }
        }

        diagnostics
    }

    pub(crate) fn walk(&mut self, root: Node<'_>) {
        let mut scope = Scope::root();
        self.walk_items(root, &mut scope);
    }

    fn walk_items(&mut self, container: Node<'_>, scope: &mut Scope) {
        for child in children(container) {
            self.visit(child, scope, None);
        }
    }

    fn visit<'t>(&mut self, node: Node<'t>, scope: &mut Scope, template: Option<Template<'t>>) {
        match node.kind() {
            "namespace_definition" => {
                let mut inner = scope.clone();
                if let Some(name) = node.child_by_field_name("name") {
                    inner.namespaces.extend(
                        self.text(name)
                            .split("::")
                            .map(str::trim)
                            .filter(|segment| !segment.is_empty() && *segment != "inline")
                            .map(str::to_string),
                    );
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk_items(body, &mut inner);
                }
            }
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        self.walk_items(body, scope);
                    } else {
                        self.visit(body, scope, None);
                    }
                }
            }
            "template_declaration" => {
                let params = self.template_params(node);
                let outer = template.map(|t| t.outer).unwrap_or(node);
                let inner = children(node).into_iter().find(|child| {
                    child.is_named()
                        && !matches!(child.kind(), "template_parameter_list" | "comment")
                });
                if let Some(inner) = inner {
                    self.visit(inner, scope, Some(Template { outer, params }));
                }
            }
            kind if RECORD_KINDS.contains(&kind) => {
                let outer = template.as_ref().map(|t| t.outer).unwrap_or(node);
                self.visit_record(node, outer, scope, template);
            }
            "enum_specifier" => {
                let outer = template.as_ref().map(|t| t.outer).unwrap_or(node);
                self.visit_enum(node, outer, scope);
            }
            "declaration" | "field_declaration" => self.visit_declaration(node, scope, template),
            "function_definition" => {
                let outer = template.as_ref().map(|t| t.outer).unwrap_or(node);
                if let Some(declarator) = node.child_by_field_name("declarator") {
                    self.visit_function(node, declarator, outer, scope, template, true);
                }
            }
            "access_specifier" => {
                scope.access = match self.text(node).trim_end_matches(':').trim() {
                    "private" => Access::Private,
                    "protected" => Access::Protected,
                    _ => Access::Public,
                };
            }
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif" | "preproc_elifdef" => {
                self.walk_items(node, scope);
            }
            "preproc_include" => self.check_include(node),
            _ => {}
        }
    }

    fn visit_declaration<'t>(
        &mut self,
        node: Node<'t>,
        scope: &mut Scope,
        template: Option<Template<'t>>,
    ) {
        let outer = template.as_ref().map(|t| t.outer).unwrap_or(node);

        if let Some(specifier) = node.child_by_field_name("type") {
            let has_body = specifier.child_by_field_name("body").is_some();
            if has_body && RECORD_KINDS.contains(&specifier.kind()) {
                self.visit_record(specifier, outer, scope, template.clone());
            } else if has_body && specifier.kind() == "enum_specifier" {
                self.visit_enum(specifier, outer, scope);
            }
        }

        let mut cursor = node.walk();
        let declarators: Vec<Node<'t>> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();

        for declarator in declarators {
            if function_declarator(declarator).is_some() {
                self.visit_function(node, declarator, outer, scope, template.clone(), false);
            } else if node.kind() == "field_declaration" && scope.record_name.is_some() {
                self.visit_field(node, declarator, outer, scope);
            }
        }
    }

    fn visit_record<'t>(
        &mut self,
        node: Node<'t>,
        outer: Node<'t>,
        scope: &Scope,
        template: Option<Template<'t>>,
    ) {
        // forward declarations carry no members
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };

        let tag = match node.kind() {
            "struct_specifier" => RecordTag::Struct,
            "union_specifier" => RecordTag::Union,
            _ => RecordTag::Class,
        };
        let default_access = match tag {
            RecordTag::Class => Access::Private,
            _ => Access::Public,
        };

        let Some(name_node) = node.child_by_field_name("name") else {
            // anonymous record: members belong to the enclosing scope
            let mut inner = scope.clone();
            inner.access = default_access;
            self.walk_items(body, &mut inner);
            return;
        };

        let (prefix, name) = split_qualified(&squash(self.text(name_node)));
        let qualified_name = scope.qualify(&join_qualified(&prefix, &name));

        let bases = children(node)
            .into_iter()
            .filter(|child| child.kind() == "base_class_clause")
            .flat_map(children)
            .filter(|base| base.is_named() && !matches!(base.kind(), "access_specifier" | "comment"))
            .map(|base| squash(self.text(base)))
            .filter(|base| base != "virtual")
            .collect();

        let decl = Declaration {
            kind: match tag {
                RecordTag::Class => DeclKind::Class,
                RecordTag::Struct => DeclKind::Struct,
                RecordTag::Union => DeclKind::Union,
            },
            name: name.clone(),
            qualified_name,
            namespaces: scope.namespaces.clone(),
            enclosing_records: scope.records.clone(),
            location: self.location(node),
            annotations: self.annotations(node, outer),
            template_params: template.map(|t| t.params).unwrap_or_default(),
            access: scope.access,
            parent: scope.parent,
            children: Vec::new(),
            detail: DeclDetail::Record(RecordInfo { tag, bases }),
        };
        let id = self.tu.push(decl);

        let mut inner = Scope {
            namespaces: scope.namespaces.clone(),
            records: scope.records.clone(),
            parent: Some(id),
            record_name: Some(name.clone()),
            access: default_access,
        };
        inner.records.extend(prefix);
        inner.records.push(name);
        self.walk_items(body, &mut inner);
    }

    fn visit_enum(&mut self, node: Node<'_>, outer: Node<'_>, scope: &Scope) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };

        let name = squash(self.text(name_node));
        let scoped = children(node)
            .iter()
            .any(|child| matches!(child.kind(), "class" | "struct"));
        let underlying = node
            .child_by_field_name("base")
            .map(|base| squash(self.text(base)));

        let enumerators = children(body)
            .into_iter()
            .filter(|child| child.kind() == "enumerator")
            .filter_map(|enumerator| {
                let name = enumerator.child_by_field_name("name")?;
                Some(Enumerator {
                    name: self.text(name).to_string(),
                    value: enumerator
                        .child_by_field_name("value")
                        .map(|value| squash(self.text(value))),
                })
            })
            .collect();

        let decl = Declaration {
            kind: DeclKind::Enum,
            qualified_name: scope.qualify(&name),
            name,
            namespaces: scope.namespaces.clone(),
            enclosing_records: scope.records.clone(),
            location: self.location(node),
            annotations: self.annotations(node, outer),
            template_params: Vec::new(),
            access: scope.access,
            parent: scope.parent,
            children: Vec::new(),
            detail: DeclDetail::Enum(EnumInfo {
                scoped,
                underlying,
                enumerators,
            }),
        };
        self.tu.push(decl);
    }

    fn visit_function<'t>(
        &mut self,
        node: Node<'t>,
        declarator: Node<'t>,
        outer: Node<'t>,
        scope: &Scope,
        template: Option<Template<'t>>,
        is_definition: bool,
    ) {
        let Some(func) = function_declarator(declarator) else {
            return;
        };
        let Some(name_node) = func.child_by_field_name("declarator") else {
            return;
        };
        if name_node.kind() == "parenthesized_declarator" {
            // function pointer
            return;
        }

        let (prefix, name) = split_qualified(&squash(self.text(name_node)));
        let is_dtor = name.starts_with('~');
        let is_operator = name.starts_with("operator");
        let return_type = self.return_type(node, declarator, func);

        let owner = prefix.last().or(scope.record_name.as_ref());
        let is_ctor = !is_dtor
            && !is_operator
            && return_type.is_none()
            && owner.is_some_and(|owner| strip_template_args(owner) == name);

        let mut info = FunctionInfo {
            return_type,
            is_ctor,
            is_dtor,
            is_operator,
            is_definition,
            ..FunctionInfo::default()
        };

        for child in children(node) {
            if child.start_byte() >= declarator.start_byte() {
                break;
            }
            match self.text(child).trim() {
                "static" => info.is_static = true,
                "virtual" => info.is_virtual = true,
                "constexpr" => info.is_constexpr = true,
                text if text.starts_with("explicit") => info.is_explicit = true,
                _ => {}
            }
        }

        if let Some(params) = func.child_by_field_name("parameters") {
            info.params = children(params)
                .into_iter()
                .filter_map(|param| self.param(param))
                .collect();
        }

        let after_params = func
            .child_by_field_name("parameters")
            .map(|params| params.end_byte())
            .unwrap_or(func.start_byte());
        for child in children(func) {
            if child.start_byte() < after_params {
                continue;
            }
            let text = self.text(child).trim();
            if child.kind() == "type_qualifier" && text == "const" {
                info.is_const = true;
            } else if child.kind() == "noexcept" || text.starts_with("noexcept") {
                info.is_noexcept = true;
            }
        }

        let kind = if scope.record_name.is_some() {
            DeclKind::Method
        } else {
            DeclKind::Function
        };

        let decl = Declaration {
            kind,
            qualified_name: scope.qualify(&join_qualified(&prefix, &name)),
            name,
            namespaces: scope.namespaces.clone(),
            enclosing_records: scope.records.clone(),
            location: self.location(node),
            annotations: self.annotations(node, outer),
            template_params: template.map(|t| t.params).unwrap_or_default(),
            access: scope.access,
            parent: scope.parent,
            children: Vec::new(),
            detail: DeclDetail::Function(info),
        };
        self.tu.push(decl);
    }

    fn visit_field(&mut self, node: Node<'_>, declarator: Node<'_>, outer: Node<'_>, scope: &Scope) {
        let Some(name) = self.declarator_name(declarator) else {
            return;
        };

        let mut type_parts = Vec::new();
        let mut is_static = false;
        for child in children(node) {
            if child.start_byte() >= declarator.start_byte() {
                break;
            }
            match child.kind() {
                "storage_class_specifier" if self.text(child).trim() == "static" => is_static = true,
                "type_qualifier" => type_parts.push(squash(self.text(child))),
                _ if Some(child) == node.child_by_field_name("type") => {
                    type_parts.push(squash(self.text(child)))
                }
                _ => {}
            }
        }
        let mut type_name = type_parts.join(" ");
        type_name.push_str(&declarator_suffix(self.text(declarator), &name));

        let decl = Declaration {
            kind: DeclKind::Field,
            qualified_name: scope.qualify(&name),
            name,
            namespaces: scope.namespaces.clone(),
            enclosing_records: scope.records.clone(),
            location: self.location(declarator),
            annotations: self.annotations(node, outer),
            template_params: Vec::new(),
            access: scope.access,
            parent: scope.parent,
            children: Vec::new(),
            detail: DeclDetail::Field(FieldInfo {
                type_name,
                is_static,
            }),
        };
        self.tu.push(decl);
    }

    fn param(&self, node: Node<'_>) -> Option<Param> {
        if !matches!(
            node.kind(),
            "parameter_declaration" | "optional_parameter_declaration" | "variadic_parameter_declaration"
        ) {
            return None;
        }

        let declarator = node.child_by_field_name("declarator");
        let type_node = node.child_by_field_name("type");
        let default = node.child_by_field_name("default_value");

        let full_end = default.map(|d| d.start_byte()).unwrap_or(node.end_byte());
        let full_text = std::str::from_utf8(&self.source[node.start_byte()..full_end]).unwrap_or_default();
        let full = squash(full_text.trim_end().trim_end_matches('=').trim_end());

        // `f(void)` has no parameters
        if declarator.is_none() && full == "void" {
            return None;
        }

        let name = declarator
            .and_then(|d| self.declarator_name(d))
            .unwrap_or_default();
        let type_name = if name.is_empty() {
            full.clone()
        } else {
            remove_last_word(&full, &name)
        };

        let declarator_kind = declarator.map(|d| d.kind()).unwrap_or_default();
        let is_reference = declarator_kind.contains("reference_declarator");
        let is_pointer = declarator_kind.contains("pointer_declarator");
        let is_rvalue_ref = is_reference
            && declarator
                .map(|d| self.text(d).trim_start().starts_with("&&"))
                .unwrap_or(false);

        let is_const = children(node)
            .iter()
            .any(|child| child.kind() == "type_qualifier" && self.text(*child).trim() == "const");
        let is_class_type = type_node.is_some_and(|t| {
            matches!(
                t.kind(),
                "type_identifier" | "qualified_identifier" | "template_type" | "dependent_type"
            )
        });
        let is_by_value_class = is_class_type && !is_reference && !is_pointer && !is_const;
        let is_pack = node.kind() == "variadic_parameter_declaration"
            || declarator.is_some_and(|d| has_descendant(d, "variadic_declarator"));

        Some(Param {
            type_name,
            name,
            full,
            default_value: default.map(|d| squash(self.text(d))),
            is_rvalue_ref,
            is_by_value_class,
            is_pack,
        })
    }

    fn template_params(&self, node: Node<'_>) -> Vec<TemplateParam> {
        let Some(list) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };

        children(list)
            .into_iter()
            .filter(|child| child.is_named())
            .filter_map(|param| {
                let kind = param.kind();
                let (param_kind, name, default) = match kind {
                    "type_parameter_declaration" | "variadic_type_parameter_declaration" => (
                        TemplateParamKind::Type,
                        self.last_named_text(param, "type_identifier"),
                        None,
                    ),
                    "optional_type_parameter_declaration" => (
                        TemplateParamKind::Type,
                        param
                            .child_by_field_name("name")
                            .map(|n| squash(self.text(n)))
                            .unwrap_or_default(),
                        param
                            .child_by_field_name("default_type")
                            .map(|d| squash(self.text(d))),
                    ),
                    "parameter_declaration" | "variadic_parameter_declaration" => (
                        TemplateParamKind::NonType,
                        param
                            .child_by_field_name("declarator")
                            .and_then(|d| self.declarator_name(d))
                            .unwrap_or_default(),
                        None,
                    ),
                    "optional_parameter_declaration" => (
                        TemplateParamKind::NonType,
                        param
                            .child_by_field_name("declarator")
                            .and_then(|d| self.declarator_name(d))
                            .unwrap_or_default(),
                        param
                            .child_by_field_name("default_value")
                            .map(|d| squash(self.text(d))),
                    ),
                    "template_template_parameter_declaration" => (
                        TemplateParamKind::Template,
                        children(param)
                            .into_iter()
                            .filter(|c| c.kind() != "template_parameter_list")
                            .map(|c| self.last_named_text(c, "type_identifier"))
                            .filter(|n| !n.is_empty())
                            .last()
                            .unwrap_or_default(),
                        None,
                    ),
                    _ => return None,
                };
                Some(TemplateParam {
                    kind: param_kind,
                    name,
                    default,
                    is_pack: kind.starts_with("variadic") || self.text(param).contains("..."),
                })
            })
            .collect()
    }

    fn return_type(&self, node: Node<'_>, declarator: Node<'_>, func: Node<'_>) -> Option<String> {
        let type_node = node.child_by_field_name("type")?;

        let mut parts = Vec::new();
        for child in children(node) {
            if child.start_byte() >= declarator.start_byte() {
                break;
            }
            if child == type_node {
                parts.push(squash(self.text(child)));
            } else if child.kind() == "type_qualifier" {
                let qualifier = self.text(child).trim();
                if matches!(qualifier, "const" | "volatile") {
                    parts.push(qualifier.to_string());
                }
            }
        }

        let mut suffix = String::new();
        let mut current = declarator;
        while current != func {
            match current.kind() {
                "pointer_declarator" => suffix.push('*'),
                "reference_declarator" => {
                    if self.text(current).trim_start().starts_with("&&") {
                        suffix.push_str("&&");
                    } else {
                        suffix.push('&');
                    }
                }
                _ => {}
            }
            current = inner_declarator(current)?;
        }

        Some(format!("{}{}", parts.join(" "), suffix))
    }

    /// Annotation tokens of a declaration: leading comments, then attributes,
    /// in source order.
    fn annotations(&self, core: Node<'_>, outer: Node<'_>) -> Vec<String> {
        let mut tokens = Vec::new();

        if self.comment_markers {
            tokens.extend(self.leading_comments(outer));
            if core != outer {
                tokens.extend(self.leading_comments(core));
            }
        }

        let mut attributes = Vec::new();
        collect_attributes(outer, &mut attributes);
        for attribute in attributes {
            tokens.extend(annotate_tokens(self.text(attribute)));
        }

        tokens
    }

    fn leading_comments(&self, node: Node<'_>) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut boundary_row = node.start_position().row;
        let mut current = node.prev_sibling();

        while let Some(prev) = current {
            if prev.kind() != "comment" || boundary_row.saturating_sub(prev.end_position().row) > 1 {
                break;
            }
            let trailing = prev
                .prev_sibling()
                .is_some_and(|before| before.end_position().row == prev.start_position().row);
            if trailing {
                break;
            }
            if let Some(token) = comment_token(self.text(prev)) {
                tokens.push(token);
            }
            boundary_row = prev.start_position().row;
            current = prev.prev_sibling();
        }

        tokens.reverse();
        tokens
    }

    fn check_include(&mut self, node: Node<'_>) {
        let Some(path) = node.child_by_field_name("path") else {
            return;
        };
        if path.kind() != "string_literal" {
            return;
        }

        let include = self.text(path).trim().trim_matches('"');
        let beside = self
            .file
            .parent()
            .is_some_and(|dir| dir.join(include).exists());
        let resolved = beside
            || self
                .tu
                .include_paths()
                .iter()
                .any(|dir| dir.join(include).exists());

        if !resolved {
            let location = self.location(node);
            self.tu.push_diagnostic(Diagnostic::warning(
                format!("cannot resolve include \"{}\"", include),
                Some(location),
            ));
        }
    }

    fn declarator_name(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "identifier" | "field_identifier" | "destructor_name" | "operator_name" => {
                Some(self.text(node).trim().to_string())
            }
            "qualified_identifier" => Some(squash(self.text(node))),
            _ => children(node)
                .into_iter()
                .filter(|child| child.is_named() && !BODY_KINDS.contains(&child.kind()))
                .find_map(|child| self.declarator_name(child)),
        }
    }

    fn last_named_text(&self, node: Node<'_>, kind: &str) -> String {
        if node.kind() == kind {
            return self.text(node).trim().to_string();
        }
        children(node)
            .into_iter()
            .filter(|child| child.kind() == kind)
            .last()
            .map(|child| self.text(child).trim().to_string())
            .unwrap_or_default()
    }

    fn location(&self, node: Node<'_>) -> SourceLocation {
        let point = node.start_position();
        SourceLocation {
            file: self.file.to_path_buf(),
            line: point.row + 1,
            column: point.column + 1,
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.source).unwrap_or_default()
    }
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn has_descendant(node: Node<'_>, kind: &str) -> bool {
    node.kind() == kind
        || children(node)
            .into_iter()
            .any(|child| has_descendant(child, kind))
}

/// Attribute nodes that belong to `node` itself, not to its body.
fn collect_attributes<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    for child in children(node) {
        match child.kind() {
            "attribute_specifier" | "attribute_declaration" => out.push(child),
            kind if BODY_KINDS.contains(&kind) => {}
            _ => collect_attributes(child, out),
        }
    }
}

fn function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "function_declarator" => Some(node),
        "pointer_declarator" | "reference_declarator" | "attributed_declarator" => {
            function_declarator(inner_declarator(node)?)
        }
        _ => None,
    }
}

fn inner_declarator(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("declarator").or_else(|| {
        let mut cursor = node.walk();
        let last = node.named_children(&mut cursor).last();
        last
    })
}

/// Collapse whitespace runs into single spaces
fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `a::b::name` into (`[a, b]`, `name`), ignoring `::` inside template arguments
fn split_qualified(text: &str) -> (Vec<String>, String) {
    let mut segments = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'<' => depth += 1,
            b'>' => depth -= 1,
            b':' if depth == 0 && bytes.get(index + 1) == Some(&b':') => {
                segments.push(text[start..index].trim().to_string());
                index += 2;
                start = index;
                continue;
            }
            _ => {}
        }
        index += 1;
    }

    let name = text[start..].trim().to_string();
    segments.retain(|segment| !segment.is_empty());
    (segments, name)
}

fn join_qualified(prefix: &[String], name: &str) -> String {
    prefix
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(name))
        .collect::<Vec<_>>()
        .join("::")
}

fn strip_template_args(name: &str) -> &str {
    name.split('<').next().unwrap_or(name).trim()
}

/// Remove the last whole-word occurrence of `word` from `text`
fn remove_last_word(text: &str, word: &str) -> String {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut search_end = text.len();

    while let Some(pos) = text[..search_end].rfind(word) {
        let before = text[..pos].chars().next_back();
        let after = text[pos + word.len()..].chars().next();
        if !before.is_some_and(is_ident) && !after.is_some_and(is_ident) {
            return squash(&format!("{} {}", &text[..pos], &text[pos + word.len()..]));
        }
        search_end = pos;
    }

    text.to_string()
}

/// Pointer, reference and array parts of a field declarator, e.g. `*` or `[4]`
fn declarator_suffix(declarator: &str, name: &str) -> String {
    let squashed = squash(declarator);
    let without_name = remove_last_word(&squashed, name);
    without_name
        .split(['=', '{'])
        .next()
        .unwrap_or_default()
        .trim()
        .replace(' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_qualified() {
        assert_eq!(
            split_qualified("ns::Outer::name"),
            (vec!["ns".to_string(), "Outer".to_string()], "name".to_string())
        );
        assert_eq!(
            split_qualified("Foo<a::B>::bar"),
            (vec!["Foo<a::B>".to_string()], "bar".to_string())
        );
        assert_eq!(split_qualified("plain"), (vec![], "plain".to_string()));
    }

    #[test]
    fn test_remove_last_word() {
        assert_eq!(remove_last_word("const int& arg2", "arg2"), "const int&");
        assert_eq!(remove_last_word("int&& arg1", "arg1"), "int&&");
        assert_eq!(remove_last_word("Arg arg", "arg"), "Arg");
    }

    #[test]
    fn test_declarator_suffix() {
        assert_eq!(declarator_suffix("*next", "next"), "*");
        assert_eq!(declarator_suffix("values[4]", "values"), "[4]");
        assert_eq!(declarator_suffix("data_", "data_"), "");
    }
}
