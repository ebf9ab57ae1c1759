//! Application-level error model.

use std::path::PathBuf;

use thiserror::Error;

use diarium_index::IndexError;
use diarium_store::StoreError;

/// Failure while opening the application context. Everything here is fatal:
/// a context is either fully wired or not opened at all.
#[derive(Debug, Error)]
pub enum OpenError {
    /// No bootstrap descriptor file was found. Raised only when the store
    /// holds no registers yet and therefore must be seeded.
    #[error("no bootstrap descriptor in {} (tried {host_specific} and {fallback})", dir.display())]
    MissingBootstrapResource {
        dir: PathBuf,
        host_specific: String,
        fallback: String,
    },

    /// The data directory could not be prepared.
    #[error("cannot create data directory {}: {source}", dir.display())]
    DirectoryCreation {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A bootstrap descriptor file exists but does not parse.
    #[error("bad bootstrap descriptor {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Failure during external-source synchronization.
///
/// Sync failures are register-local: they are logged and isolate to the
/// failing register's thread, never aborting the context.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("external source failure for register {register}: {reason}")]
    ExternalSourceFailure { register: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    pub fn source_failure(register: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalSourceFailure {
            register: register.into(),
            reason: reason.into(),
        }
    }
}
