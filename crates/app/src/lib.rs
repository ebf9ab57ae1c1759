//! `diarium-app` — context wiring, bootstrap, and register synchronization.
//!
//! [`Diarium::open`] assembles the prevalent store, the search index, and
//! the background index worker into one explicit context object, seeds
//! registers from the bootstrap descriptors on first start, and kicks off a
//! per-register synchronization pass against the configured
//! [`ExternalSource`].

pub mod config;
pub mod context;
pub mod error;
pub mod sync;

pub use config::RegisterDescriptor;
pub use context::{Diarium, DiariumOptions, SearchOutcome};
pub use error::{OpenError, SyncError};
pub use sync::{
    ActionRecord, CaseRecord, DocumentRecord, ExternalSource, RegisterHandle, SourceBatch,
    UnitRecord, UserRecord,
};
