//! Enum conversion plugin for flextool
//!
//! Capabilities:
//! - `enum-to-string`: `to_string(E)` and `<E>_from_string(std::string_view)`
//! - `enum-to-json`: nlohmann-json `to_json`/`from_json` overloads
//!
//! Both accept a `prefix = "..."` argument that is stripped from the printed
//! enumerator names:
//!
//! ```cpp
//! // {gen};{funccall};enum_to_string(prefix = "Color_")
//! enum class Color { Color_Red, Color_Green };
//! ```

mod render;
mod table;

pub use table::{EnumTable, TableEntry};

use flex_plugin_api::{
    flex_plugin, CapabilityEntry, DeclKind, GeneratedCode, GenerationError, GenerationRequest,
    GenerationResult, KindScope, PluginDescriptor,
};
use tracing::debug;

pub const PLUGIN_ID: &str = "flex_enum_plugin";

const KNOWN_ARGS: &[&str] = &["prefix"];

flex_plugin! {
    id: PLUGIN_ID,
    entry: descriptor
}

#[cfg(feature = "dynamic")]
flex_plugin_api::export_plugin!(descriptor);

/// Descriptor of the enum plugin
pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(PLUGIN_ID, env!("CARGO_PKG_VERSION"))
        .with_metadata(
            "Enum conversions",
            "flextool",
            "String and JSON conversions for annotated enums",
        )
        .thread_safe(true)
        .with_capability(CapabilityEntry::new(
            "enum-to-string",
            KindScope::only([DeclKind::Enum]),
            enum_to_string,
        ))
        .with_capability(CapabilityEntry::new(
            "enum-to-json",
            KindScope::only([DeclKind::Enum]),
            enum_to_json,
        ))
}

fn enum_to_string(request: &GenerationRequest<'_>) -> GenerationResult {
    let table = table_for(request)?;
    Ok(vec![GeneratedCode::new(render::string_conversions(&table))])
}

fn enum_to_json(request: &GenerationRequest<'_>) -> GenerationResult {
    let table = table_for(request)?;
    Ok(vec![GeneratedCode::new(render::json_conversions(&table))])
}

fn table_for(request: &GenerationRequest<'_>) -> Result<EnumTable, GenerationError> {
    for arg in &request.invocation.args {
        match arg.name.as_deref() {
            Some(name) if KNOWN_ARGS.contains(&name) => {}
            Some(name) => {
                return Err(GenerationError::invalid_input(format!(
                    "unknown argument '{}' for {}",
                    name,
                    request.capability()
                )))
            }
            None => {
                return Err(GenerationError::invalid_input(format!(
                    "unexpected argument '{}' for {}",
                    arg.value,
                    request.capability()
                )))
            }
        }
    }

    let table = EnumTable::from_declaration(request.declaration, request.arg("prefix"))?;
    debug!(
        plugin = request.plugin_id,
        declaration = %table.qualified_name,
        enumerators = table.entries.len(),
        aliases = table.entries.iter().filter(|e| e.is_alias).count(),
        "Built enum table"
    );
    Ok(table)
}
