//! Search query and result types.

use diarium_core::Identity;
use diarium_domain::{EntityKind, EntityRef, Root};
use serde::{Deserialize, Serialize};

/// Structured index query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchQuery {
    /// Free-text match over the tokenized text field.
    Text { value: String },
    /// Exact term match on a raw field (entity kind, facet fields).
    Term { field: String, value: String },
}

impl SearchQuery {
    pub fn text(value: impl Into<String>) -> Self {
        SearchQuery::Text {
            value: value.into(),
        }
    }

    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        SearchQuery::Term {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// One search hit.
///
/// Carries the identity and kind of the matched entity, not a copy of it:
/// [`resolve`](SearchResult::resolve) looks the live entity up in the root
/// so facet grouping and matching always see current state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub identity: Identity,
    pub kind: EntityKind,
    pub score: f32,
}

impl SearchResult {
    /// The live entity behind this hit, if it is still in the graph.
    pub fn resolve<'a>(&self, root: &'a Root) -> Option<EntityRef<'a>> {
        root.entity(self.kind, self.identity)
    }
}
