//! Declaration Scanner
//!
//! Yields the (declaration, capability) pairs of a translation unit in
//! source order. Declarations without markers are skipped silently; a
//! declaration with several markers yields one match per distinct tag.

use flex_plugin_api::{AnnotationInvocation, CapabilityTag, DeclId, DeclarationHandle, TranslationUnit};
use tracing::{debug, warn};

/// A declaration matched by one generation marker
#[derive(Debug, Clone)]
pub struct ScanMatch<'tu> {
    pub declaration: DeclarationHandle<'tu>,
    pub invocation: AnnotationInvocation,
}

impl ScanMatch<'_> {
    pub fn tag(&self) -> &CapabilityTag {
        &self.invocation.tag
    }
}

/// Scans one successfully parsed translation unit.
///
/// The scan is lazy and restartable: every call to [`Scanner::matches`]
/// starts a fresh pass over the same translation unit.
#[derive(Debug, Clone)]
pub struct Scanner<'tu> {
    tu: &'tu TranslationUnit,
    marker_prefix: String,
}

impl<'tu> Scanner<'tu> {
    pub fn new(tu: &'tu TranslationUnit, marker_prefix: impl Into<String>) -> Self {
        Self {
            tu,
            marker_prefix: marker_prefix.into(),
        }
    }

    pub fn translation_unit(&self) -> &'tu TranslationUnit {
        self.tu
    }

    pub fn matches(&self) -> Matches<'_, 'tu> {
        Matches {
            tu: self.tu,
            marker_prefix: &self.marker_prefix,
            decl: 0,
            token: 0,
            seen: Vec::new(),
        }
    }
}

impl<'s, 'tu> IntoIterator for &'s Scanner<'tu> {
    type Item = ScanMatch<'tu>;
    type IntoIter = Matches<'s, 'tu>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches()
    }
}

/// Lazy iterator over the matches of a [`Scanner`]
pub struct Matches<'s, 'tu> {
    tu: &'tu TranslationUnit,
    marker_prefix: &'s str,
    decl: usize,
    token: usize,
    /// Tags already yielded for the current declaration
    seen: Vec<CapabilityTag>,
}

impl<'tu> Iterator for Matches<'_, 'tu> {
    type Item = ScanMatch<'tu>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let declaration = self.tu.get(DeclId(self.decl))?;
            let tokens = declaration.annotations();

            let Some(token) = tokens.get(self.token) else {
                self.decl += 1;
                self.token = 0;
                self.seen.clear();
                continue;
            };
            self.token += 1;

            match AnnotationInvocation::parse(token, self.marker_prefix) {
                Ok(None) => continue,
                Ok(Some(invocation)) => {
                    if self.seen.contains(&invocation.tag) {
                        warn!(
                            declaration = %declaration.qualified_name(),
                            location = %declaration.location(),
                            capability = %invocation.tag,
                            "Duplicate generation marker, keeping the first"
                        );
                        continue;
                    }
                    debug!(
                        declaration = %declaration.qualified_name(),
                        capability = %invocation.tag,
                        "Matched declaration"
                    );
                    self.seen.push(invocation.tag.clone());
                    return Some(ScanMatch {
                        declaration,
                        invocation,
                    });
                }
                Err(error) => {
                    warn!(
                        declaration = %declaration.qualified_name(),
                        location = %declaration.location(),
                        error = %error,
                        "Ignoring malformed generation marker"
                    );
                }
            }
        }
    }
}
