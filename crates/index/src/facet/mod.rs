//! Facet engine: derived grouping dimensions over search results.
//!
//! A facet definition has two responsibilities, both expressed as visitors
//! over the closed entity set:
//!
//! 1. **Field contribution** at index time: which raw terms an entity adds
//!    to the facet's index field.
//! 2. **Runtime grouping**: the distinct values present in a result set,
//!    re-derived from the live graph, plus a per-value membership predicate
//!    that re-runs the same per-type lookup against a fixed target value.
//!
//! The facet set is closed and known at build time.

mod units;

use diarium_domain::{EntityRef, Root};
use serde::Serialize;

use crate::search::{SearchQuery, SearchResult};

pub use units::UnitsFacet;

/// A named facet rule over the closed entity set.
pub trait FacetDefinition: Send + Sync {
    /// Index field carrying this facet's raw terms.
    fn field(&self) -> &'static str;

    /// Human-readable facet title.
    fn title(&self) -> &'static str;

    /// Every facet value `entity` contributes at index time. An entity with
    /// no resolvable value contributes nothing; null is never indexed as a
    /// literal term.
    fn index_terms(&self, entity: EntityRef<'_>, root: &Root) -> Vec<String>;

    /// Group a result set: the distinct facet values present, re-derived
    /// from the live entities behind the results.
    fn facet(&self, results: &[SearchResult], root: &Root) -> Facet;

    /// Whether `entity` resolves to `value` under this facet. This is the
    /// matcher behind every [`FacetValue`] of this definition.
    fn matches(&self, entity: EntityRef<'_>, root: &Root, value: &str) -> bool;
}

/// A computed facet: distinct values present in one result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub title: &'static str,
    pub values: Vec<FacetValue>,
}

/// One distinct facet value.
///
/// Serializes to a structured `{ field, value }` filter so a caller can turn
/// "click this facet value" into a term query without knowing the matcher
/// internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetValue {
    pub field: &'static str,
    pub value: String,
}

impl FacetValue {
    /// The term query selecting exactly the results indexed under this
    /// value.
    pub fn to_query(&self) -> SearchQuery {
        SearchQuery::term(self.field, self.value.clone())
    }
}
