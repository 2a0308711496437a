//! Enumerator tables with alias detection

use flex_plugin_api::{DeclarationHandle, Enumerator, GenerationError};

/// One enumerator as it appears in the generated code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    /// Enumerator name in the source
    pub name: String,
    /// Name printed by the generated code
    pub label: String,
    /// Shares its value with an earlier enumerator
    pub is_alias: bool,
}

/// Everything the renderers need to know about one enum
#[derive(Debug, Clone)]
pub struct EnumTable {
    /// `colors::Color`
    pub qualified_name: String,
    /// Name without the enclosing namespaces, with `::` replaced by `_`
    pub local_ident: String,
    pub namespaces: Vec<String>,
    pub entries: Vec<TableEntry>,
}

impl EnumTable {
    pub fn from_declaration(
        declaration: DeclarationHandle<'_>,
        prefix: Option<&str>,
    ) -> Result<Self, GenerationError> {
        let info = declaration.enumeration().ok_or_else(|| {
            GenerationError::unsupported(format!(
                "'{}' is a {}, not an enum",
                declaration.qualified_name(),
                declaration.kind()
            ))
        })?;
        if declaration.name().is_empty() {
            return Err(GenerationError::unsupported("anonymous enums have no type to convert"));
        }
        if info.enumerators.is_empty() {
            return Err(GenerationError::unsupported(format!(
                "enum '{}' has no enumerators",
                declaration.qualified_name()
            )));
        }

        let namespaces = declaration.namespaces().to_vec();
        let namespace_prefix = namespaces
            .iter()
            .map(|ns| format!("{}::", ns))
            .collect::<String>();
        let qualified_name = declaration.qualified_name().to_string();
        let local_ident = qualified_name
            .strip_prefix(&namespace_prefix)
            .unwrap_or(&qualified_name)
            .replace("::", "_");

        let values = enumerator_values(&info.enumerators);
        let entries = info
            .enumerators
            .iter()
            .enumerate()
            .map(|(index, enumerator)| {
                let is_alias = values[index]
                    .is_some_and(|value| values[..index].contains(&Some(value)));
                TableEntry {
                    name: enumerator.name.clone(),
                    label: label(&enumerator.name, prefix),
                    is_alias,
                }
            })
            .collect();

        Ok(Self {
            qualified_name,
            local_ident,
            namespaces,
            entries,
        })
    }

    /// `colors::Color::Red`
    pub fn qualify(&self, entry: &TableEntry) -> String {
        format!("{}::{}", self.qualified_name, entry.name)
    }

    /// Entries that get their own `case` label
    pub fn distinct(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.iter().filter(|entry| !entry.is_alias)
    }
}

fn label(name: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => match name.strip_prefix(prefix) {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => name.to_string(),
        },
        _ => name.to_string(),
    }
}

/// Best-effort values of the enumerators.
///
/// Integer literals and references to earlier enumerators are understood;
/// anything else makes the value (and the implicit values after it) unknown
/// until the next explicit literal.
fn enumerator_values(enumerators: &[Enumerator]) -> Vec<Option<i128>> {
    let mut values: Vec<Option<i128>> = Vec::with_capacity(enumerators.len());
    let mut next = Some(0i128);

    for enumerator in enumerators {
        let value = match enumerator.value.as_deref().map(str::trim) {
            None => next,
            Some(text) => parse_integer(text).or_else(|| {
                enumerators
                    .iter()
                    .take(values.len())
                    .position(|earlier| earlier.name == text)
                    .and_then(|index| values[index])
            }),
        };
        values.push(value);
        next = value.and_then(|v| v.checked_add(1));
    }
    values
}

fn parse_integer(text: &str) -> Option<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim()),
        None => (false, text),
    };
    let digits = digits.trim_end_matches(['u', 'U', 'l', 'L']).replace('\'', "");

    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i128::from_str_radix(bin, 2).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i128::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i128>().ok()?
    };

    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enumerator(name: &str, value: Option<&str>) -> Enumerator {
        Enumerator {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn test_implicit_and_explicit_values() {
        let values = enumerator_values(&[
            enumerator("A", None),
            enumerator("B", Some("5")),
            enumerator("C", None),
            enumerator("D", Some("0x10")),
            enumerator("E", Some("-1")),
        ]);
        assert_eq!(values, vec![Some(0), Some(5), Some(6), Some(16), Some(-1)]);
    }

    #[test]
    fn test_references_and_unknown_expressions() {
        let values = enumerator_values(&[
            enumerator("First", None),
            enumerator("Default", Some("First")),
            enumerator("Shifted", Some("1 << 3")),
            enumerator("After", None),
            enumerator("Reset", Some("2")),
        ]);
        assert_eq!(values, vec![Some(0), Some(0), None, None, Some(2)]);
    }

    #[test]
    fn test_parse_integer_forms() {
        assert_eq!(parse_integer("42u"), Some(42));
        assert_eq!(parse_integer("0b101"), Some(5));
        assert_eq!(parse_integer("010"), Some(8));
        assert_eq!(parse_integer("1'000"), Some(1000));
        assert_eq!(parse_integer("- 3"), Some(-3));
        assert_eq!(parse_integer("FOO"), None);
    }

    #[test]
    fn test_label_prefix() {
        assert_eq!(label("Color_Red", Some("Color_")), "Red");
        assert_eq!(label("Color_", Some("Color_")), "Color_");
        assert_eq!(label("Other", Some("Color_")), "Other");
        assert_eq!(label("Red", None), "Red");
    }
}
