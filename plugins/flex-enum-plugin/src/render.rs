//! C++ text for the enum conversions

use crate::table::EnumTable;
use std::fmt::Write;

/// `to_string` plus `<Name>_from_string`
pub fn string_conversions(table: &EnumTable) -> String {
    let q = &table.qualified_name;
    let mut body = String::new();

    let _ = writeln!(body, "inline constexpr std::string_view to_string({} value) noexcept", q);
    body.push_str("{\n  switch (value) {\n");
    for entry in table.distinct() {
        let _ = writeln!(
            body,
            "    case {}: return \"{}\";",
            table.qualify(entry),
            escape(&entry.label)
        );
    }
    body.push_str("  }\n  return \"<unknown>\";\n}\n\n");

    let _ = writeln!(
        body,
        "inline std::optional<{}> {}_from_string(std::string_view text) noexcept",
        q, table.local_ident
    );
    body.push_str("{\n");
    for entry in &table.entries {
        let _ = writeln!(
            body,
            "  if (text == \"{}\") return {};",
            escape(&entry.label),
            table.qualify(entry)
        );
    }
    body.push_str("  return std::nullopt;\n}\n");

    wrap(table, &["<optional>", "<string_view>"], &body)
}

/// nlohmann-json style `to_json`/`from_json`
pub fn json_conversions(table: &EnumTable) -> String {
    let q = &table.qualified_name;
    let names = format!("{}_json_names", table.local_ident);
    let mut body = String::new();

    let _ = writeln!(
        body,
        "inline constexpr std::pair<{}, std::string_view> {}[] = {{",
        q, names
    );
    for entry in table.distinct() {
        let _ = writeln!(body, "  {{{}, \"{}\"}},", table.qualify(entry), escape(&entry.label));
    }
    body.push_str("};\n\n");

    let _ = writeln!(body, "inline void to_json(nlohmann::json& j, const {}& value)", q);
    let _ = writeln!(body, "{{\n  for (const auto& [item, name] : {}) {{", names);
    body.push_str("    if (item == value) {\n      j = name;\n      return;\n    }\n  }\n");
    body.push_str("  j = nullptr;\n}\n\n");

    let _ = writeln!(body, "inline void from_json(const nlohmann::json& j, {}& value)", q);
    body.push_str("{\n  const auto text = j.get<std::string>();\n");
    let _ = writeln!(body, "  for (const auto& [item, name] : {}) {{", names);
    body.push_str("    if (name == text) {\n      value = item;\n      return;\n    }\n  }\n");
    let _ = writeln!(
        body,
        "  throw std::invalid_argument(\"unknown {} value: \" + text);\n}}",
        escape(q)
    );

    wrap(
        table,
        &["<stdexcept>", "<string>", "<string_view>", "<utility>", "<nlohmann/json.hpp>"],
        &body,
    )
}

/// Includes, then `body` inside the enum's namespaces so that argument
/// dependent lookup finds the functions
fn wrap(table: &EnumTable, includes: &[&str], body: &str) -> String {
    let mut out = String::from("#pragma once\n\n");
    for include in includes {
        let _ = writeln!(out, "#include {}", include);
    }
    out.push('\n');

    for ns in &table.namespaces {
        let _ = writeln!(out, "namespace {} {{", ns);
    }
    if !table.namespaces.is_empty() {
        out.push('\n');
    }
    out.push_str(body);
    if !table.namespaces.is_empty() {
        out.push('\n');
    }
    for ns in table.namespaces.iter().rev() {
        let _ = writeln!(out, "}} // namespace {}", ns);
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
