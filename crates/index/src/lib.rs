//! `diarium-index` — searchable view over the record graph.
//!
//! The index is derived state: it can always be rebuilt from the current
//! root via [`IndexService::reconstruct`], and is kept current between
//! rebuilds by applying the store's mutation stream in commit order through
//! an [`IndexWorker`]. Facets are computed from the **live** graph at query
//! time, never from stored index terms, so values always reflect current
//! state.

pub mod error;
pub mod facet;
pub mod schema;
pub mod search;
pub mod service;
pub mod worker;

pub use error::{IndexError, IndexResult};
pub use facet::{Facet, FacetDefinition, FacetValue, UnitsFacet};
pub use search::{SearchQuery, SearchResult};
pub use service::{IndexEntry, IndexService};
pub use worker::{IndexWorker, WorkerHandle};
