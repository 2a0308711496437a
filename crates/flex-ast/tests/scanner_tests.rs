use flex_ast::{CppAstProvider, Scanner, DEFAULT_MARKER_PREFIX};
use flex_plugin_api::TranslationUnit;
use pretty_assertions::assert_eq;
use std::path::Path;

const SOURCE: &str = r#"namespace colors {

// {gen};{funccall};enum_to_string()
// {gen};{funccall};enum_to_json(prefix = "A_")
enum class A { A_One, A_Two };

// {gen};{funccall};enum_to_string()
// {gen};{funccall};enum-to-string()
// {gen};{funccall};broken(
enum class B { One };

struct Holder {
  // {gen};{funccall};enum_to_string()
  enum Nested { N1 };

  // skip_pimpl
  void plain();
};

} // namespace colors
"#;

fn parse() -> TranslationUnit {
    CppAstProvider::default()
        .parse_source(Path::new("colors.hpp"), SOURCE, &[])
        .unwrap()
}

#[test]
fn test_matches_in_source_order() {
    let tu = parse();
    let scanner = Scanner::new(&tu, DEFAULT_MARKER_PREFIX);

    let matches: Vec<(String, String, usize)> = scanner
        .matches()
        .map(|m| {
            (
                m.declaration.qualified_name().to_string(),
                m.tag().to_string(),
                m.declaration.location().line,
            )
        })
        .collect();

    assert_eq!(
        matches,
        vec![
            ("colors::A".to_string(), "enum-to-string".to_string(), 5),
            ("colors::A".to_string(), "enum-to-json".to_string(), 5),
            ("colors::B".to_string(), "enum-to-string".to_string(), 10),
            ("colors::Holder::Nested".to_string(), "enum-to-string".to_string(), 14),
        ]
    );
}

#[test]
fn test_marker_arguments_are_parsed() {
    let tu = parse();
    let scanner = Scanner::new(&tu, DEFAULT_MARKER_PREFIX);

    let json = scanner
        .matches()
        .find(|m| m.tag().as_str() == "enum-to-json")
        .unwrap();
    assert_eq!(json.invocation.arg("prefix"), Some("A_"));
}

#[test]
fn test_scan_is_restartable() {
    let tu = parse();
    let scanner = Scanner::new(&tu, DEFAULT_MARKER_PREFIX);

    let first: Vec<_> = scanner.matches().map(|m| m.declaration.id()).collect();
    let second: Vec<_> = (&scanner).into_iter().map(|m| m.declaration.id()).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn test_plain_annotations_are_not_matches() {
    let tu = parse();
    let plain = tu.declarations().find(|d| d.name() == "plain").unwrap();
    assert_eq!(plain.annotations(), &["skip_pimpl".to_string()]);

    let scanner = Scanner::new(&tu, DEFAULT_MARKER_PREFIX);
    assert!(scanner.matches().all(|m| m.declaration.name() != "plain"));
}

#[test]
fn test_custom_prefix() {
    let tu = CppAstProvider::default()
        .parse_source(
            Path::new("custom.hpp"),
            "// @gen enum_to_string()\nenum class C { X };\n",
            &[],
        )
        .unwrap();

    assert_eq!(Scanner::new(&tu, DEFAULT_MARKER_PREFIX).matches().count(), 0);
    assert_eq!(Scanner::new(&tu, "@gen ").matches().count(), 1);
}
