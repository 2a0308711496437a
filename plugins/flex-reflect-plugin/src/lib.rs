//! Reflection metadata plugin for flextool
//!
//! `reflection-metadata` specializes `flex::reflect::TypeInfo<T>` for an
//! annotated class, struct or union: its name, its non-static fields (name,
//! type, access) and the names of its ordinary methods. The bare argument
//! `fields_only` leaves the methods out.

use flex_plugin_api::{
    flex_plugin, Access, CapabilityEntry, DeclKind, DeclarationHandle, GeneratedCode,
    GenerationError, GenerationRequest, GenerationResult, KindScope, PluginDescriptor,
};
use std::fmt::Write;
use tracing::debug;

pub const PLUGIN_ID: &str = "flex_reflect_plugin";

flex_plugin! {
    id: PLUGIN_ID,
    entry: descriptor
}

#[cfg(feature = "dynamic")]
flex_plugin_api::export_plugin!(descriptor);

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(PLUGIN_ID, env!("CARGO_PKG_VERSION"))
        .with_metadata(
            "Reflection metadata",
            "flextool",
            "Compile-time field and method tables for annotated records",
        )
        .thread_safe(true)
        .with_capability(CapabilityEntry::new(
            "reflection-metadata",
            KindScope::only([DeclKind::Class, DeclKind::Struct, DeclKind::Union]),
            reflection_metadata,
        ))
}

/// A reflected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub name: String,
    pub type_name: String,
    pub access: Access,
}

/// What gets reflected for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    pub qualified_name: String,
    pub fields: Vec<FieldEntry>,
    /// Method names in declaration order, overloads once
    pub methods: Vec<String>,
}

impl RecordMetadata {
    pub fn collect(record: DeclarationHandle<'_>, fields_only: bool) -> Result<Self, GenerationError> {
        if record.is_template() {
            return Err(GenerationError::unsupported(format!(
                "'{}' is a class template; reflect a specialization instead",
                record.qualified_name()
            )));
        }

        let fields = record
            .fields()
            .filter(|field| field.field().is_some_and(|info| !info.is_static))
            .filter_map(|field| {
                field.field().map(|info| FieldEntry {
                    name: field.name().to_string(),
                    type_name: info.type_name.clone(),
                    access: field.access(),
                })
            })
            .collect::<Vec<_>>();

        let mut methods: Vec<String> = Vec::new();
        if !fields_only {
            for method in record.methods() {
                let Some(info) = method.function() else {
                    continue;
                };
                if info.is_ctor || info.is_dtor || info.is_operator {
                    continue;
                }
                if !methods.iter().any(|name| name == method.name()) {
                    methods.push(method.name().to_string());
                }
            }
        }

        if fields.is_empty() && methods.is_empty() {
            return Err(GenerationError::unsupported(format!(
                "'{}' has no fields or methods to reflect",
                record.qualified_name()
            )));
        }

        Ok(Self {
            qualified_name: record.qualified_name().to_string(),
            fields,
            methods,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::from(
            "#pragma once\n\n#include <array>\n#include <cstddef>\n#include <string_view>\n\n",
        );
        out.push_str("namespace flex::reflect {\n\n");
        out.push_str("template <typename T>\nstruct TypeInfo;\n\n");
        let _ = writeln!(out, "template <>\nstruct TypeInfo<::{}>\n{{", self.qualified_name);
        out.push_str("  enum class Access { Public, Protected, Private };\n\n");
        out.push_str(
            "  struct Field\n  {\n    std::string_view name;\n    std::string_view type;\n    Access access;\n  };\n\n",
        );
        let _ = writeln!(
            out,
            "  static constexpr std::string_view name = \"{}\";",
            escape(&self.qualified_name)
        );
        let _ = writeln!(
            out,
            "  static constexpr std::size_t field_count = {};\n",
            self.fields.len()
        );

        let _ = writeln!(
            out,
            "  static constexpr std::array<Field, {}> fields = {{{{",
            self.fields.len()
        );
        for field in &self.fields {
            let _ = writeln!(
                out,
                "    {{\"{}\", \"{}\", Access::{}}},",
                escape(&field.name),
                escape(&field.type_name),
                access_name(field.access)
            );
        }
        out.push_str("  }};\n\n");

        let _ = writeln!(
            out,
            "  static constexpr std::array<std::string_view, {}> methods = {{{{",
            self.methods.len()
        );
        for method in &self.methods {
            let _ = writeln!(out, "    \"{}\",", escape(method));
        }
        out.push_str("  }};\n};\n\n} // namespace flex::reflect\n");
        out
    }
}

fn reflection_metadata(request: &GenerationRequest<'_>) -> GenerationResult {
    let mut fields_only = false;
    for arg in &request.invocation.args {
        match (arg.name.as_deref(), arg.value.as_str()) {
            (None, "fields_only") => fields_only = true,
            (Some("fields_only"), value) => fields_only = value != "false",
            (name, value) => {
                return Err(GenerationError::invalid_input(format!(
                    "unknown argument '{}' for reflection-metadata",
                    name.unwrap_or(value)
                )))
            }
        }
    }

    let metadata = RecordMetadata::collect(request.declaration, fields_only)?;
    debug!(
        declaration = %metadata.qualified_name,
        fields = metadata.fields.len(),
        methods = metadata.methods.len(),
        "Collected reflection metadata"
    );
    Ok(vec![GeneratedCode::new(metadata.render())])
}

fn access_name(access: Access) -> &'static str {
    match access {
        Access::Public => "Public",
        Access::Protected => "Protected",
        Access::Private => "Private",
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_methods() {
        let metadata = RecordMetadata {
            qualified_name: "geo::Point".to_string(),
            fields: vec![FieldEntry {
                name: "x".to_string(),
                type_name: "int".to_string(),
                access: Access::Private,
            }],
            methods: vec![],
        };

        let text = metadata.render();
        assert!(text.contains("struct TypeInfo<::geo::Point>"));
        assert!(text.contains("static constexpr std::size_t field_count = 1;"));
        assert!(text.contains("    {\"x\", \"int\", Access::Private},\n"));
        assert!(text.contains("std::array<std::string_view, 0> methods = {{\n  }};"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"say "hi"\n"#), r#"say \"hi\"\\n"#);
    }
}
