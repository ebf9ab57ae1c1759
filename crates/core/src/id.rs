//! Process-wide entity identity.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of any entity in the record graph.
///
/// A 64-bit, strictly monotonically increasing integer, unique process-wide
/// and never reused. Identities are allocated exclusively through the
/// identity-factory command so that replaying the journal reproduces the
/// exact same sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(u64);

impl Identity {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The identity that follows this one in allocation order.
    pub fn successor(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl core::fmt::Display for Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for Identity {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Identity> for u64 {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl FromStr for Identity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = u64::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("Identity: {e}")))?;
        Ok(Self(value))
    }
}
