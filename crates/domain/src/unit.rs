//! Unit: an organizational subdivision referenced by cases and actions.

use diarium_core::{Entity, Identity};
use serde::{Deserialize, Serialize};

/// Organizational unit, identified by a code and optionally a display name.
///
/// Value-like and shared by reference across cases/actions, but equality is
/// by identity, not by attribute. Units are never hard-deleted; clearing the
/// `active` flag is the deletion idiom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    identity: Identity,
    code: String,
    name: Option<String>,
    active: bool,
}

impl Unit {
    pub fn new(identity: Identity, code: impl Into<String>, name: Option<String>) -> Self {
        Self {
            identity,
            code: code.into(),
            name,
            active: true,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Human-readable value: the name, falling back to the code.
    pub fn display_value(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.code)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl Entity for Unit {
    fn identity(&self) -> Identity {
        self.identity
    }
}
