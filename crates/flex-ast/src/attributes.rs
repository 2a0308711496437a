//! Annotation tokens from attribute and comment text

/// String arguments of every `annotate(...)` call in an attribute.
///
/// Adjacent string literals are concatenated, so
/// `annotate("{gen};{funccall};f(" "x = 1" ")")` yields `{gen};{funccall};f(x = 1)`.
pub(crate) fn annotate_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut search_from = 0;

    while let Some(found) = text[search_from..].find("annotate") {
        let start = search_from + found;
        search_from = start + "annotate".len();

        let preceded_by_ident = text[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if preceded_by_ident {
            continue;
        }

        let rest = text[search_from..].trim_start();
        let Some(args) = rest.strip_prefix('(') else {
            continue;
        };
        if let Some(token) = leading_string_literals(args) {
            tokens.push(token);
        }
    }

    tokens
}

/// Concatenate the string literals at the start of `text`, stopping at the
/// first `,` or `)`.
fn leading_string_literals(text: &str) -> Option<String> {
    let mut token = String::new();
    let mut chars = text.chars().peekable();
    let mut seen_literal = false;

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next()? {
            '"' => {
                seen_literal = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            'n' => token.push('\n'),
                            't' => token.push('\t'),
                            other => token.push(other),
                        },
                        c => token.push(c),
                    }
                }
            }
            ',' | ')' if seen_literal => return Some(token),
            _ => return None,
        }
    }
}

/// Annotation token carried by a comment, or `None` for an empty comment.
pub(crate) fn comment_token(text: &str) -> Option<String> {
    let text = text.trim();
    let body = if let Some(line) = text.strip_prefix("//") {
        line.trim_start_matches(['/', '!']).trim().to_string()
    } else if let Some(block) = text.strip_prefix("/*") {
        let block = block.strip_suffix("*/").unwrap_or(block);
        block
            .trim_start_matches(['*', '!'])
            .lines()
            .map(|line| line.trim().trim_start_matches('*').trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        return None;
    };

    (!body.is_empty()).then_some(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_gnu_attribute() {
        assert_eq!(
            annotate_tokens(r#"__attribute__((annotate("{gen};{funccall};enum_to_string()")))"#),
            vec!["{gen};{funccall};enum_to_string()".to_string()]
        );
    }

    #[test]
    fn test_concatenated_literals() {
        assert_eq!(
            annotate_tokens(
                r#"__attribute__((annotate("{gen};{funccall};inject_pimpl_storage(" "sizePadding = 8" ")")))"#
            ),
            vec!["{gen};{funccall};inject_pimpl_storage(sizePadding = 8)".to_string()]
        );
    }

    #[test]
    fn test_cxx11_attribute_with_several_annotations() {
        assert_eq!(
            annotate_tokens(r#"[[clang::annotate("skip_pimpl"), clang::annotate("a\"b", 1)]]"#),
            vec!["skip_pimpl".to_string(), "a\"b".to_string()]
        );
    }

    #[test]
    fn test_non_annotate_attributes_are_ignored() {
        assert!(annotate_tokens("__attribute__((unused))").is_empty());
        assert!(annotate_tokens("[[nodiscard]]").is_empty());
        assert!(annotate_tokens("__attribute__((my_annotate(\"x\")))").is_empty());
    }

    #[test]
    fn test_comment_tokens() {
        assert_eq!(
            comment_token("// {gen};{funccall};enum_to_string()").as_deref(),
            Some("{gen};{funccall};enum_to_string()")
        );
        assert_eq!(comment_token("/// skip_pimpl").as_deref(), Some("skip_pimpl"));
        assert_eq!(
            comment_token("/* {gen};{funccall};reflection_metadata() */").as_deref(),
            Some("{gen};{funccall};reflection_metadata()")
        );
        assert_eq!(comment_token("//"), None);
    }
}
