//! Parse failure reporting

use flex_plugin_api::{Diagnostic, SourceLocation};
use std::fmt;
use std::path::{Path, PathBuf};

pub type AstResult<T> = Result<T, ParseFailure>;

/// The provider could not produce a usable tree for a file.
///
/// The file is skipped as a whole; no partial scanning happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub file: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseFailure {
    pub fn new(file: impl Into<PathBuf>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            file: file.into(),
            diagnostics,
        }
    }

    /// The file could not be read at all
    pub fn unreadable(file: &Path, error: &std::io::Error) -> Self {
        Self::new(
            file,
            vec![Diagnostic::error(
                format!("cannot read source file: {}", error),
                None,
            )],
        )
    }

    /// Location of the first fatal diagnostic
    pub fn first_location(&self) -> Option<&SourceLocation> {
        self.diagnostics
            .iter()
            .filter(|d| d.is_fatal())
            .find_map(|d| d.location.as_ref())
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fatal = self.diagnostics.iter().filter(|d| d.is_fatal()).count();
        write!(f, "failed to parse {} ({} error(s)", self.file.display(), fatal)?;
        if let Some(first) = self.diagnostics.iter().find(|d| d.is_fatal()) {
            write!(f, "; first: {}", first)?;
        }
        f.write_str(")")
    }
}

impl std::error::Error for ParseFailure {}
