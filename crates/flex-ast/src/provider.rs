//! AST Provider: source file in, translation unit or parse failure out

use crate::error::{AstResult, ParseFailure};
use crate::walker::Walker;
use flex_plugin_api::{Diagnostic, TranslationUnit};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use tree_sitter::Parser;

/// Parses one translation unit.
///
/// Implementations are shared read-only across workers; any parser state is
/// created per call, so every worker owns its own parser instance.
pub trait AstProvider: Send + Sync {
    fn parse(&self, path: &Path, include_paths: &[PathBuf]) -> AstResult<TranslationUnit>;
}

/// tree-sitter based C++ front end
#[derive(Debug, Clone)]
pub struct CppAstProvider {
    comment_markers: bool,
}

impl Default for CppAstProvider {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CppAstProvider {
    /// `comment_markers` enables annotation tokens written as comments
    /// directly above a declaration.
    pub fn new(comment_markers: bool) -> Self {
        Self { comment_markers }
    }

    /// Parse in-memory source as if it were the file at `path`.
    pub fn parse_source(
        &self,
        path: &Path,
        source: &str,
        include_paths: &[PathBuf],
    ) -> AstResult<TranslationUnit> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .map_err(|e| {
                ParseFailure::new(
                    path,
                    vec![Diagnostic::error(format!("cannot load C++ grammar: {}", e), None)],
                )
            })?;

        let tree = parser.parse(source, None).ok_or_else(|| {
            ParseFailure::new(path, vec![Diagnostic::error("parser produced no tree", None)])
        })?;
        let root = tree.root_node();

        let tu = TranslationUnit::new(path, include_paths.to_vec());
        let mut walker = Walker::new(source, tu, path, self.comment_markers);

        if root.has_error() {
            let diagnostics = walker.syntax_errors(root);
            debug!(
                file = %path.display(),
                errors = diagnostics.len(),
                "Syntax errors, skipping file"
            );
            return Err(ParseFailure::new(path, diagnostics));
        }

        walker.walk(root);
        let tu = walker.finish();

        debug!(
            file = %path.display(),
            declarations = tu.len(),
            warnings = tu.diagnostics().len(),
            "Parsed translation unit"
        );
        Ok(tu)
    }
}

impl AstProvider for CppAstProvider {
    #[instrument(skip(self, include_paths), fields(file = %path.display()))]
    fn parse(&self, path: &Path, include_paths: &[PathBuf]) -> AstResult<TranslationUnit> {
        let source =
            std::fs::read_to_string(path).map_err(|e| ParseFailure::unreadable(path, &e))?;
        self.parse_source(path, &source, include_paths)
    }
}
