//! Index error model.

use thiserror::Error;

/// Result type used across the index layer.
pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Operation after `close()`. Programmer error, surfaced immediately.
    #[error("index is closed")]
    IndexClosed,

    /// The underlying inverted-index engine failed.
    #[error("index engine: {0}")]
    Engine(#[from] tantivy::TantivyError),

    /// A query referenced an unknown field or could not be parsed.
    #[error("bad query: {0}")]
    Query(String),

    /// Index directory could not be prepared.
    #[error("index I/O: {0}")]
    Io(#[from] std::io::Error),

    /// A synchronization primitive was poisoned by a panicking writer.
    #[error("internal: {0}")]
    Internal(String),
}

impl IndexError {
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
