//! Action: a recorded step taken within a case.

use chrono::{DateTime, Utc};
use diarium_core::{Entity, Identity};
use serde::{Deserialize, Serialize};

/// A recorded step within a case.
///
/// May carry its own unit, distinct from the case's unit; both are
/// independently indexable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    identity: Identity,
    case: Identity,
    note: Option<String>,
    unit: Option<Identity>,
    owner: Option<Identity>,
    documents: Vec<Identity>,
    modified_at: Option<DateTime<Utc>>,
}

impl Action {
    pub fn new(identity: Identity, case: Identity) -> Self {
        Self {
            identity,
            case,
            note: None,
            unit: None,
            owner: None,
            documents: Vec::new(),
            modified_at: None,
        }
    }

    pub fn with_details(
        mut self,
        note: Option<String>,
        unit: Option<Identity>,
        owner: Option<Identity>,
        modified_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.note = note;
        self.unit = unit;
        self.owner = owner;
        self.modified_at = modified_at;
        self
    }

    pub fn case(&self) -> Identity {
        self.case
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn unit(&self) -> Option<Identity> {
        self.unit
    }

    pub fn owner(&self) -> Option<Identity> {
        self.owner
    }

    /// Identities of the documents this action owns, in insertion order.
    pub fn documents(&self) -> &[Identity] {
        &self.documents
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub(crate) fn attach_document(&mut self, document: Identity) {
        self.documents.push(document);
    }
}

impl Entity for Action {
    fn identity(&self) -> Identity {
        self.identity
    }
}
