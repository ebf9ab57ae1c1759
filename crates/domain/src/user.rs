//! User: an actor identity with non-owning back-references into the graph.

use chrono::{DateTime, Utc};
use diarium_core::{Entity, Identity};
use serde::{Deserialize, Serialize};

/// A user known to the system.
///
/// The case/action lists are **lookup indices**, not ownership: they are
/// maintained by [`Root`](crate::Root) whenever a case or action is linked
/// to this user, and exist purely for reverse navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    identity: Identity,
    signature: String,
    name: Option<String>,
    unit: Option<String>,
    profile_code: Option<String>,
    email: Option<String>,
    active: bool,
    modified_at: Option<DateTime<Utc>>,

    owned_cases: Vec<Identity>,
    handled_cases: Vec<Identity>,
    registered_cases: Vec<Identity>,
    modified_cases: Vec<Identity>,
    owned_actions: Vec<Identity>,
}

impl User {
    pub fn new(identity: Identity, signature: impl Into<String>) -> Self {
        Self {
            identity,
            signature: signature.into(),
            name: None,
            unit: None,
            profile_code: None,
            email: None,
            active: true,
            modified_at: None,
            owned_cases: Vec::new(),
            handled_cases: Vec::new(),
            registered_cases: Vec::new(),
            modified_cases: Vec::new(),
            owned_actions: Vec::new(),
        }
    }

    pub fn with_details(
        mut self,
        name: Option<String>,
        unit: Option<String>,
        profile_code: Option<String>,
        email: Option<String>,
    ) -> Self {
        self.name = name;
        self.unit = unit;
        self.profile_code = profile_code;
        self.email = email;
        self
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn profile_code(&self) -> Option<&str> {
        self.profile_code.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn owned_cases(&self) -> &[Identity] {
        &self.owned_cases
    }

    pub fn handled_cases(&self) -> &[Identity] {
        &self.handled_cases
    }

    pub fn registered_cases(&self) -> &[Identity] {
        &self.registered_cases
    }

    pub fn modified_cases(&self) -> &[Identity] {
        &self.modified_cases
    }

    pub fn owned_actions(&self) -> &[Identity] {
        &self.owned_actions
    }

    pub(crate) fn link(&mut self, role: UserRole, entity: Identity) {
        let index = self.index_mut(role);
        if !index.contains(&entity) {
            index.push(entity);
        }
    }

    pub(crate) fn unlink(&mut self, role: UserRole, entity: Identity) {
        self.index_mut(role).retain(|id| *id != entity);
    }

    fn index_mut(&mut self, role: UserRole) -> &mut Vec<Identity> {
        match role {
            UserRole::CaseOwner => &mut self.owned_cases,
            UserRole::CaseHandler => &mut self.handled_cases,
            UserRole::CaseRegistrant => &mut self.registered_cases,
            UserRole::CaseModifier => &mut self.modified_cases,
            UserRole::ActionOwner => &mut self.owned_actions,
        }
    }
}

/// Which back-reference index a user link belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum UserRole {
    CaseOwner,
    CaseHandler,
    CaseRegistrant,
    CaseModifier,
    ActionOwner,
}

impl Entity for User {
    fn identity(&self) -> Identity {
        self.identity
    }
}
