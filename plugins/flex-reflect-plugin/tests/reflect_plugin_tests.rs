use flex_ast::{CppAstProvider, Scanner, DEFAULT_MARKER_PREFIX};
use flex_plugin_api::{Access, GenerationError, GenerationRequest};
use flex_reflect_plugin::{descriptor, FieldEntry, RecordMetadata, PLUGIN_ID};
use pretty_assertions::assert_eq;
use std::path::Path;

const SHAPES: &str = r#"namespace geo {

// {gen};{funccall};reflection_metadata()
class Circle {
 public:
  Circle();
  ~Circle();
  double area() const;
  double area(double scale) const;
  bool operator==(const Circle& other) const;

 protected:
  double radius_;

 private:
  static int instances_;
  std::string label_;
};

// {gen};{funccall};reflection_metadata(fields_only)
struct Size { int w; int h; void grow(); };

// {gen};{funccall};reflection_metadata()
struct Empty {};

} // namespace geo
"#;

fn generate_all() -> Vec<Result<String, GenerationError>> {
    let tu = CppAstProvider::default()
        .parse_source(Path::new("shapes.hpp"), SHAPES, &[])
        .unwrap();
    let plugin = descriptor();
    let entry = &plugin.capabilities[0];

    Scanner::new(&tu, DEFAULT_MARKER_PREFIX)
        .matches()
        .map(|scan_match| {
            let request = GenerationRequest {
                declaration: scan_match.declaration,
                invocation: &scan_match.invocation,
                source_path: tu.path(),
                plugin_id: PLUGIN_ID,
            };
            entry
                .generate(&request)
                .map(|codes| codes.into_iter().map(|c| c.contents).collect())
        })
        .collect()
}

#[test]
fn test_collects_fields_and_methods() {
    let tu = CppAstProvider::default()
        .parse_source(Path::new("shapes.hpp"), SHAPES, &[])
        .unwrap();
    let circle = tu.find_record("geo::Circle").unwrap();

    let metadata = RecordMetadata::collect(circle, false).unwrap();
    assert_eq!(
        metadata,
        RecordMetadata {
            qualified_name: "geo::Circle".to_string(),
            fields: vec![
                FieldEntry {
                    name: "radius_".to_string(),
                    type_name: "double".to_string(),
                    access: Access::Protected,
                },
                FieldEntry {
                    name: "label_".to_string(),
                    type_name: "std::string".to_string(),
                    access: Access::Private,
                },
            ],
            methods: vec!["area".to_string()],
        }
    );
}

#[test]
fn test_generated_specialization() {
    let results = generate_all();
    assert_eq!(results.len(), 3);

    let circle = results[0].as_ref().unwrap();
    assert!(circle.contains("namespace flex::reflect {"));
    assert!(circle.contains("struct TypeInfo<::geo::Circle>"));
    assert!(circle.contains("static constexpr std::string_view name = \"geo::Circle\";"));
    assert!(circle.contains("{\"label_\", \"std::string\", Access::Private},"));
    assert!(circle.contains("std::array<std::string_view, 1> methods = {{\n    \"area\",\n  }};"));

    let size = results[1].as_ref().unwrap();
    assert!(size.contains("std::array<Field, 2> fields"));
    assert!(size.contains("std::array<std::string_view, 0> methods"));
    assert!(!size.contains("\"grow\""));

    assert!(matches!(results[2], Err(GenerationError::Unsupported { .. })));
}
