//! Case: a single administrative matter within a register.

use chrono::{DateTime, Utc};
use diarium_core::{Entity, Identity};
use serde::{Deserialize, Serialize};

/// An administrative case.
///
/// Belongs to exactly one register; resolves to it via ownership, never
/// through a cycle back over actions/documents. The unit and the four user
/// references are non-owning identity associations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    identity: Identity,
    register: Identity,
    number: String,
    title: Option<String>,
    unit: Option<Identity>,
    owner: Option<Identity>,
    handler: Option<Identity>,
    registrant: Option<Identity>,
    modifier: Option<Identity>,
    actions: Vec<Identity>,
    modified_at: Option<DateTime<Utc>>,
}

impl Case {
    pub fn new(identity: Identity, register: Identity, number: impl Into<String>) -> Self {
        Self {
            identity,
            register,
            number: number.into(),
            title: None,
            unit: None,
            owner: None,
            handler: None,
            registrant: None,
            modifier: None,
            actions: Vec::new(),
            modified_at: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_details(
        mut self,
        title: Option<String>,
        unit: Option<Identity>,
        owner: Option<Identity>,
        handler: Option<Identity>,
        registrant: Option<Identity>,
        modifier: Option<Identity>,
        modified_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.title = title;
        self.unit = unit;
        self.owner = owner;
        self.handler = handler;
        self.registrant = registrant;
        self.modifier = modifier;
        self.modified_at = modified_at;
        self
    }

    pub fn register(&self) -> Identity {
        self.register
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn unit(&self) -> Option<Identity> {
        self.unit
    }

    pub fn owner(&self) -> Option<Identity> {
        self.owner
    }

    pub fn handler(&self) -> Option<Identity> {
        self.handler
    }

    pub fn registrant(&self) -> Option<Identity> {
        self.registrant
    }

    pub fn modifier(&self) -> Option<Identity> {
        self.modifier
    }

    /// Identities of the actions this case owns, in insertion order.
    pub fn actions(&self) -> &[Identity] {
        &self.actions
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub(crate) fn attach_action(&mut self, action: Identity) {
        self.actions.push(action);
    }

    pub(crate) fn apply_patch(&mut self, patch: &CasePatch) {
        if let Some(title) = &patch.title {
            self.title = Some(title.clone());
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(owner) = patch.owner {
            self.owner = owner;
        }
        if let Some(handler) = patch.handler {
            self.handler = handler;
        }
        if let Some(registrant) = patch.registrant {
            self.registrant = registrant;
        }
        if let Some(modifier) = patch.modifier {
            self.modifier = modifier;
        }
        if let Some(modified_at) = patch.modified_at {
            self.modified_at = Some(modified_at);
        }
    }
}

/// Partial update to a case, applied through [`Root::update_case`].
///
/// `None` keeps the existing value; `Some(None)` on a reference field clears
/// it.
///
/// [`Root::update_case`]: crate::Root::update_case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePatch {
    pub title: Option<String>,
    pub unit: Option<Option<Identity>>,
    pub owner: Option<Option<Identity>>,
    pub handler: Option<Option<Identity>>,
    pub registrant: Option<Option<Identity>>,
    pub modifier: Option<Option<Identity>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Entity for Case {
    fn identity(&self) -> Identity {
        self.identity
    }
}
