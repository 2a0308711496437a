//! C++ front end and Declaration Scanner for flextool
//!
//! [`CppAstProvider`] parses one source file with tree-sitter and lowers the
//! syntax tree into the read-only declaration model of `flex-plugin-api`.
//! [`Scanner`] then walks that model and yields the declarations carrying
//! generation markers, one [`ScanMatch`] per (declaration, capability) pair.
//!
//! Annotation tokens come from `annotate` attributes and, when enabled, from
//! comments placed directly above a declaration:
//!
//! ```cpp
//! // {gen};{funccall};enum_to_string()
//! enum class Color { Red, Green };
//!
//! class __attribute__((annotate("{gen};{funccall};reflection_metadata()"))) Point {
//!   int x;
//! };
//! ```

pub mod error;
pub mod provider;
pub mod scanner;

mod attributes;
mod walker;

pub use error::{AstResult, ParseFailure};
pub use provider::{AstProvider, CppAstProvider};
pub use scanner::{Matches, ScanMatch, Scanner};

/// Marker prefix used by flextool annotations
pub const DEFAULT_MARKER_PREFIX: &str = "{gen};{funccall};";
