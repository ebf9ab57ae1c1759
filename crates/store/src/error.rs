//! Store error model.

use diarium_core::DomainError;
use thiserror::Error;

/// Result type used across the store layer.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The journal or a snapshot could not be replayed into a consistent
    /// root. Fatal: aborts startup.
    #[error("replay inconsistency: {0}")]
    ReplayInconsistency(String),

    /// Operation after `close()`. Programmer error, surfaced immediately.
    #[error("store is closed")]
    StoreClosed,

    /// The command was durably journaled but deterministically rejected by
    /// the domain. Replay reproduces the same rejection.
    #[error("command rejected: {0}")]
    Rejected(#[from] DomainError),

    /// Journal or snapshot I/O failed.
    #[error("journal I/O: {0}")]
    Io(#[from] std::io::Error),

    /// A journal entry or snapshot could not be encoded/decoded.
    #[error("journal codec: {0}")]
    Codec(#[from] serde_json::Error),

    /// A synchronization primitive was poisoned by a panicking writer.
    #[error("internal: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn replay(msg: impl Into<String>) -> Self {
        Self::ReplayInconsistency(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
