//! Capability tags and the per-capability strategy table

use crate::declaration::DeclKind;
use crate::error::GenerationError;
use crate::request::{GeneratedCode, GenerationRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Identifier naming a kind of code generation (e.g. `enum-to-string`).
///
/// Tags are normalised on construction: lowercase, with `_` folded into `-`,
/// so `enum_to_string` and `enum-to-string` name the same capability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CapabilityTag(String);

impl CapabilityTag {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_lowercase().replace('_', "-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CapabilityTag {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<CapabilityTag> for String {
    fn from(value: CapabilityTag) -> Self {
        value.0
    }
}

/// The declaration kinds a capability claim applies to.
///
/// Two claims on the same tag only conflict when their scopes overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindScope {
    Any,
    Only(BTreeSet<DeclKind>),
}

impl KindScope {
    pub fn only(kinds: impl IntoIterator<Item = DeclKind>) -> Self {
        Self::Only(kinds.into_iter().collect())
    }

    pub fn contains(&self, kind: DeclKind) -> bool {
        match self {
            Self::Any => true,
            Self::Only(kinds) => kinds.contains(&kind),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Only(kinds) if kinds.is_empty())
    }

    fn kinds(&self) -> BTreeSet<DeclKind> {
        match self {
            Self::Any => DeclKind::ALL.iter().copied().collect(),
            Self::Only(kinds) => kinds.clone(),
        }
    }

    pub fn intersection(&self, other: &KindScope) -> KindScope {
        match (self, other) {
            (Self::Any, Self::Any) => Self::Any,
            _ => Self::Only(self.kinds().intersection(&other.kinds()).copied().collect()),
        }
    }

    pub fn overlaps(&self, other: &KindScope) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Kinds in `self` that are not in `other`.
    pub fn difference(&self, other: &KindScope) -> KindScope {
        Self::Only(self.kinds().difference(&other.kinds()).copied().collect())
    }
}

impl fmt::Display for KindScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Only(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                f.write_str(&names.join("|"))
            }
        }
    }
}

/// Output of a strategy invocation
pub type GenerationResult = Result<Vec<GeneratedCode>, GenerationError>;

/// A generation strategy. Must be pure: the same request yields the same
/// output byte for byte.
pub type Strategy = Arc<dyn Fn(&GenerationRequest<'_>) -> GenerationResult + Send + Sync>;

/// One row of a plugin's capability table.
#[derive(Clone)]
pub struct CapabilityEntry {
    pub tag: CapabilityTag,
    pub scope: KindScope,
    /// Replace earlier claims on the same tag instead of conflicting with them
    pub overrides: bool,
    strategy: Strategy,
}

impl CapabilityEntry {
    pub fn new<F>(tag: impl Into<CapabilityTag>, scope: KindScope, strategy: F) -> Self
    where
        F: Fn(&GenerationRequest<'_>) -> GenerationResult + Send + Sync + 'static,
    {
        Self {
            tag: tag.into(),
            scope,
            overrides: false,
            strategy: Arc::new(strategy),
        }
    }

    /// Mark this claim as an explicit override of earlier plugins.
    pub fn overriding(mut self) -> Self {
        self.overrides = true;
        self
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn generate(&self, request: &GenerationRequest<'_>) -> GenerationResult {
        (self.strategy)(request)
    }
}

impl fmt::Debug for CapabilityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityEntry")
            .field("tag", &self.tag)
            .field("scope", &self.scope)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}
