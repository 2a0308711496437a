//! Generation marker grammar
//!
//! A marker is an annotation token of the form `<prefix><name>(<args>)`,
//! for example `{gen};{funccall};enum_to_string(prefix = "Color_")`.
//! Tokens without the prefix are plain annotations and are not parsed.

use crate::capability::CapabilityTag;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A marker token that carries the prefix but cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    #[error("marker '{token}' has no argument list")]
    MissingArguments { token: String },

    #[error("marker '{token}' has an empty or invalid capability name")]
    InvalidName { token: String },

    #[error("marker '{token}' has unbalanced parentheses or quotes")]
    Unbalanced { token: String },

    #[error("marker '{token}' has trailing text after the argument list")]
    TrailingInput { token: String },
}

/// One argument of a marker: `name = value` or a bare `value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationArg {
    pub name: Option<String>,
    pub value: String,
}

/// A parsed generation marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationInvocation {
    pub tag: CapabilityTag,
    pub args: Vec<AnnotationArg>,
    /// The token as written
    pub raw: String,
}

impl AnnotationInvocation {
    /// Parse `token` as a marker.
    ///
    /// Returns `Ok(None)` when the token does not start with `prefix`.
    pub fn parse(token: &str, prefix: &str) -> Result<Option<Self>, MarkerError> {
        let Some(rest) = token.trim().strip_prefix(prefix) else {
            return Ok(None);
        };
        let rest = rest.trim();

        let open = rest.find('(').ok_or_else(|| MarkerError::MissingArguments {
            token: token.to_string(),
        })?;

        let name = rest[..open].trim();
        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(MarkerError::InvalidName {
                token: token.to_string(),
            });
        }

        let close = matching_paren(rest, open).ok_or_else(|| MarkerError::Unbalanced {
            token: token.to_string(),
        })?;
        if !rest[close + 1..].trim().is_empty() {
            return Err(MarkerError::TrailingInput {
                token: token.to_string(),
            });
        }

        let args = split_top_level(&rest[open + 1..close], ',')
            .into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(parse_arg)
            .collect();

        Ok(Some(Self {
            tag: CapabilityTag::new(name),
            args,
            raw: token.to_string(),
        }))
    }

    /// Value of the named argument
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|arg| arg.name.as_deref() == Some(name))
            .map(|arg| arg.value.as_str())
    }

    /// Whether a bare argument equal to `flag` is present
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args
            .iter()
            .any(|arg| arg.name.is_none() && arg.value == flag)
    }
}

fn parse_arg(item: &str) -> AnnotationArg {
    if let Some(eq) = split_top_level(item, '=').first().map(|head| head.len()) {
        if eq < item.len() {
            let name = item[..eq].trim();
            let is_ident = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if is_ident {
                return AnnotationArg {
                    name: Some(name.to_string()),
                    value: unquote(item[eq + 1..].trim()).to_string(),
                };
            }
        }
    }
    AnnotationArg {
        name: None,
        value: unquote(item).to_string(),
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Byte index of the `)` closing the `(` at `open`, skipping quoted text.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for (index, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        if in_quotes {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `separator` outside quotes and brackets.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    split_nested(text, separator, true)
        .or_else(|| split_nested(text, separator, false))
        .unwrap_or_else(|| vec![text])
}

/// `None` when a `<` is never closed, as in `a < b`. A stray `>` or `->`
/// is plain text.
fn split_nested(text: &str, separator: char, angles: bool) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut angle_depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0;
    let mut previous = None;

    for (index, c) in text.char_indices() {
        let after_dash = previous == Some('-');
        previous = Some(c);
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '<' if angles => angle_depth += 1,
            '>' if angles && !after_dash => angle_depth = angle_depth.saturating_sub(1),
            c if c == separator && depth == 0 && angle_depth == 0 => {
                parts.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    if angle_depth != 0 {
        return None;
    }
    parts.push(&text[start..]);
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PREFIX: &str = "{gen};{funccall};";

    #[test]
    fn test_plain_token_is_not_a_marker() {
        assert_eq!(AnnotationInvocation::parse("skip_pimpl", PREFIX), Ok(None));
    }

    #[test]
    fn test_parse_marker_with_args() {
        let marker = AnnotationInvocation::parse(
            r#"{gen};{funccall};inject_pimpl_storage(size = 64, alignment="16", without_method_body)"#,
            PREFIX,
        )
        .unwrap()
        .unwrap();

        assert_eq!(marker.tag.as_str(), "inject-pimpl-storage");
        assert_eq!(marker.arg("size"), Some("64"));
        assert_eq!(marker.arg("alignment"), Some("16"));
        assert!(marker.has_flag("without_method_body"));
        assert_eq!(marker.args.len(), 3);
    }

    #[test]
    fn test_parse_marker_without_args() {
        let marker = AnnotationInvocation::parse("{gen};{funccall};enum_to_string()", PREFIX)
            .unwrap()
            .unwrap();
        assert_eq!(marker.tag.as_str(), "enum-to-string");
        assert!(marker.args.is_empty());
    }

    #[test]
    fn test_nested_and_quoted_args() {
        let marker = AnnotationInvocation::parse(
            r#"{gen};{funccall};custom(type = std::map<int, int>, text = "a, (b)")"#,
            PREFIX,
        )
        .unwrap()
        .unwrap();
        assert_eq!(marker.arg("type"), Some("std::map<int, int>"));
        assert_eq!(marker.arg("text"), Some("a, (b)"));
    }

    #[test]
    fn test_comparison_and_arrow_args() {
        let marker = AnnotationInvocation::parse(
            "{gen};{funccall};custom(cond = a > b, via = p->q, x = 1)",
            PREFIX,
        )
        .unwrap()
        .unwrap();
        assert_eq!(marker.arg("cond"), Some("a > b"));
        assert_eq!(marker.arg("via"), Some("p->q"));
        assert_eq!(marker.arg("x"), Some("1"));

        let marker =
            AnnotationInvocation::parse("{gen};{funccall};custom(cond = a < b, x = 1)", PREFIX)
                .unwrap()
                .unwrap();
        assert_eq!(marker.arg("cond"), Some("a < b"));
        assert_eq!(marker.arg("x"), Some("1"));
    }

    #[test]
    fn test_malformed_markers() {
        assert!(matches!(
            AnnotationInvocation::parse("{gen};{funccall};enum_to_string", PREFIX),
            Err(MarkerError::MissingArguments { .. })
        ));
        assert!(matches!(
            AnnotationInvocation::parse("{gen};{funccall};enum_to_string(a", PREFIX),
            Err(MarkerError::Unbalanced { .. })
        ));
        assert!(matches!(
            AnnotationInvocation::parse("{gen};{funccall};(a)", PREFIX),
            Err(MarkerError::InvalidName { .. })
        ));
        assert!(matches!(
            AnnotationInvocation::parse("{gen};{funccall};x(a) y", PREFIX),
            Err(MarkerError::TrailingInput { .. })
        ));
    }
}
