//! Document: a file/record attached to an action.

use diarium_core::{Entity, Identity};
use serde::{Deserialize, Serialize};

/// A document attached to exactly one action, never directly to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    identity: Identity,
    action: Identity,
    title: String,
}

impl Document {
    pub fn new(identity: Identity, action: Identity, title: impl Into<String>) -> Self {
        Self {
            identity,
            action,
            title: title.into(),
        }
    }

    pub fn action(&self) -> Identity {
        self.action
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl Entity for Document {
    fn identity(&self) -> Identity {
        self.identity
    }
}
