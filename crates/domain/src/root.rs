//! The prevalent system root: sole owner of the record graph.

use std::collections::BTreeMap;

use diarium_core::{DomainError, DomainResult, Entity, Identity};
use serde::{Deserialize, Serialize};

use crate::case::CasePatch;
use crate::user::UserRole;
use crate::{Action, Case, Document, EntityKind, EntityRef, Register, Unit, User};

/// Root of the ownership graph.
///
/// Owns the identity counter and every entity table; all other entities are
/// reachable only through it. Mutation goes through the methods below, which
/// keep the user back-reference indices and the parent/child lists
/// consistent. Entities are created exclusively by command execution against
/// the store, never constructed and inserted ad hoc.
///
/// Tables are `BTreeMap` so enumeration order is deterministic, which keeps
/// snapshots and index reconstruction stable across replays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Root {
    next_identity: u64,
    registers: BTreeMap<Identity, Register>,
    cases: BTreeMap<Identity, Case>,
    actions: BTreeMap<Identity, Action>,
    documents: BTreeMap<Identity, Document>,
    units: BTreeMap<Identity, Unit>,
    users: BTreeMap<Identity, User>,
}

impl Root {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the identity counter and return the next identity.
    ///
    /// Only the identity-factory command calls this; the counter is part of
    /// the replayed state, so the sequence is reproduced exactly on replay.
    pub fn allocate_identity(&mut self) -> Identity {
        self.next_identity += 1;
        Identity::new(self.next_identity)
    }

    pub fn register(&self, identity: Identity) -> Option<&Register> {
        self.registers.get(&identity)
    }

    pub fn case(&self, identity: Identity) -> Option<&Case> {
        self.cases.get(&identity)
    }

    pub fn action(&self, identity: Identity) -> Option<&Action> {
        self.actions.get(&identity)
    }

    pub fn document(&self, identity: Identity) -> Option<&Document> {
        self.documents.get(&identity)
    }

    pub fn unit(&self, identity: Identity) -> Option<&Unit> {
        self.units.get(&identity)
    }

    pub fn user(&self, identity: Identity) -> Option<&User> {
        self.users.get(&identity)
    }

    pub fn registers(&self) -> impl Iterator<Item = &Register> {
        self.registers.values()
    }

    pub fn has_registers(&self) -> bool {
        !self.registers.is_empty()
    }

    /// Look up any entity by kind and identity.
    pub fn entity(&self, kind: EntityKind, identity: Identity) -> Option<EntityRef<'_>> {
        match kind {
            EntityKind::Register => self.register(identity).map(EntityRef::Register),
            EntityKind::Case => self.case(identity).map(EntityRef::Case),
            EntityKind::Action => self.action(identity).map(EntityRef::Action),
            EntityKind::Document => self.document(identity).map(EntityRef::Document),
            EntityKind::Unit => self.unit(identity).map(EntityRef::Unit),
            EntityKind::User => self.user(identity).map(EntityRef::User),
        }
    }

    /// Every entity reachable from the root, in deterministic order.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.registers
            .values()
            .map(EntityRef::Register)
            .chain(self.cases.values().map(EntityRef::Case))
            .chain(self.actions.values().map(EntityRef::Action))
            .chain(self.documents.values().map(EntityRef::Document))
            .chain(self.units.values().map(EntityRef::Unit))
            .chain(self.users.values().map(EntityRef::User))
    }

    pub fn insert_register(&mut self, register: Register) -> DomainResult<()> {
        self.claim(register.identity())?;
        self.registers.insert(register.identity(), register);
        Ok(())
    }

    pub fn insert_unit(&mut self, unit: Unit) -> DomainResult<()> {
        self.claim(unit.identity())?;
        self.units.insert(unit.identity(), unit);
        Ok(())
    }

    pub fn insert_user(&mut self, user: User) -> DomainResult<()> {
        self.claim(user.identity())?;
        self.users.insert(user.identity(), user);
        Ok(())
    }

    /// Insert a case, attaching it to its register and linking user
    /// back-references.
    pub fn insert_case(&mut self, case: Case) -> DomainResult<()> {
        self.claim(case.identity())?;
        if !self.registers.contains_key(&case.register()) {
            return Err(DomainError::unknown_identity(format!(
                "case {} references register {}",
                case.identity(),
                case.register()
            )));
        }
        self.check_unit_ref(case.unit())?;
        for user in [case.owner(), case.handler(), case.registrant(), case.modifier()] {
            self.check_user_ref(user)?;
        }

        let identity = case.identity();
        self.link_case_users(&case);
        if let Some(register) = self.registers.get_mut(&case.register()) {
            register.attach_case(identity);
        }
        self.cases.insert(identity, case);
        Ok(())
    }

    /// Apply a partial update to a case, relinking user back-references for
    /// any reference that changed.
    pub fn update_case(&mut self, identity: Identity, patch: &CasePatch) -> DomainResult<()> {
        if let Some(unit) = patch.unit {
            self.check_unit_ref(unit)?;
        }
        for user in [patch.owner, patch.handler, patch.registrant, patch.modifier] {
            if let Some(user) = user {
                self.check_user_ref(user)?;
            }
        }

        let case = self.cases.get_mut(&identity).ok_or_else(|| {
            DomainError::unknown_identity(format!("no case with identity {identity}"))
        })?;
        let before = case.clone();
        case.apply_patch(patch);
        let after = case.clone();

        self.unlink_case_users(&before);
        self.link_case_users(&after);
        Ok(())
    }

    /// Insert an action, attaching it to its case and linking the owner
    /// back-reference.
    pub fn insert_action(&mut self, action: Action) -> DomainResult<()> {
        self.claim(action.identity())?;
        if !self.cases.contains_key(&action.case()) {
            return Err(DomainError::unknown_identity(format!(
                "action {} references case {}",
                action.identity(),
                action.case()
            )));
        }
        self.check_unit_ref(action.unit())?;
        self.check_user_ref(action.owner())?;

        let identity = action.identity();
        if let Some(owner) = action.owner()
            && let Some(user) = self.users.get_mut(&owner)
        {
            user.link(UserRole::ActionOwner, identity);
        }
        if let Some(case) = self.cases.get_mut(&action.case()) {
            case.attach_action(identity);
        }
        self.actions.insert(identity, action);
        Ok(())
    }

    /// Insert a document, attaching it to its action.
    pub fn insert_document(&mut self, document: Document) -> DomainResult<()> {
        self.claim(document.identity())?;
        let action = self.actions.get_mut(&document.action()).ok_or_else(|| {
            DomainError::unknown_identity(format!(
                "document {} references action {}",
                document.identity(),
                document.action()
            ))
        })?;
        action.attach_document(document.identity());
        self.documents.insert(document.identity(), document);
        Ok(())
    }

    /// Soft-deactivation: units are never removed from the graph.
    pub fn set_unit_active(&mut self, identity: Identity, active: bool) -> DomainResult<()> {
        let unit = self.units.get_mut(&identity).ok_or_else(|| {
            DomainError::unknown_identity(format!("no unit with identity {identity}"))
        })?;
        unit.set_active(active);
        Ok(())
    }

    fn claim(&self, identity: Identity) -> DomainResult<()> {
        let in_use = self.registers.contains_key(&identity)
            || self.cases.contains_key(&identity)
            || self.actions.contains_key(&identity)
            || self.documents.contains_key(&identity)
            || self.units.contains_key(&identity)
            || self.users.contains_key(&identity);
        if in_use {
            return Err(DomainError::conflict(format!(
                "identity {identity} is already in use"
            )));
        }
        if identity.value() > self.next_identity {
            return Err(DomainError::invariant(format!(
                "identity {identity} was never allocated"
            )));
        }
        Ok(())
    }

    fn check_unit_ref(&self, unit: Option<Identity>) -> DomainResult<()> {
        if let Some(unit) = unit
            && !self.units.contains_key(&unit)
        {
            return Err(DomainError::unknown_identity(format!(
                "no unit with identity {unit}"
            )));
        }
        Ok(())
    }

    fn check_user_ref(&self, user: Option<Identity>) -> DomainResult<()> {
        if let Some(user) = user
            && !self.users.contains_key(&user)
        {
            return Err(DomainError::unknown_identity(format!(
                "no user with identity {user}"
            )));
        }
        Ok(())
    }

    fn link_case_users(&mut self, case: &Case) {
        for (role, user) in case_user_roles(case) {
            if let Some(user) = user
                && let Some(user) = self.users.get_mut(&user)
            {
                user.link(role, case.identity());
            }
        }
    }

    fn unlink_case_users(&mut self, case: &Case) {
        for (role, user) in case_user_roles(case) {
            if let Some(user) = user
                && let Some(user) = self.users.get_mut(&user)
            {
                user.unlink(role, case.identity());
            }
        }
    }
}

fn case_user_roles(case: &Case) -> [(UserRole, Option<Identity>); 4] {
    [
        (UserRole::CaseOwner, case.owner()),
        (UserRole::CaseHandler, case.handler()),
        (UserRole::CaseRegistrant, case.registrant()),
        (UserRole::CaseModifier, case.modifier()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_root() -> (Root, Identity, Identity, Identity) {
        let mut root = Root::new();
        let register = root.allocate_identity();
        root.insert_register(Register::new(register, "Diariet", "jdbc:x"))
            .unwrap();
        let unit = root.allocate_identity();
        root.insert_unit(Unit::new(unit, "KSF", Some("Stadskansliet".into())))
            .unwrap();
        let user = root.allocate_identity();
        root.insert_user(User::new(user, "ab1234")).unwrap();
        (root, register, unit, user)
    }

    #[test]
    fn allocation_is_strictly_monotonic() {
        let mut root = Root::new();
        let a = root.allocate_identity();
        let b = root.allocate_identity();
        let c = root.allocate_identity();
        assert!(a < b && b < c);
    }

    #[test]
    fn unallocated_identity_is_rejected() {
        let mut root = Root::new();
        let err = root
            .insert_register(Register::new(Identity::new(99), "R", "jdbc:x"))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn case_insert_links_register_and_user_indices() {
        let (mut root, register, unit, user) = seeded_root();
        let case_id = root.allocate_identity();
        let mut case = Case::new(case_id, register, "2024/17");
        case.apply_patch(&CasePatch {
            unit: Some(Some(unit)),
            owner: Some(Some(user)),
            handler: Some(Some(user)),
            ..CasePatch::default()
        });
        root.insert_case(case).unwrap();

        assert_eq!(root.register(register).unwrap().cases(), &[case_id]);
        let user = root.user(user).unwrap();
        assert_eq!(user.owned_cases(), &[case_id]);
        assert_eq!(user.handled_cases(), &[case_id]);
        assert!(user.registered_cases().is_empty());
    }

    #[test]
    fn case_update_relinks_user_indices() {
        let (mut root, register, _unit, user) = seeded_root();
        let other = root.allocate_identity();
        root.insert_user(User::new(other, "cd5678")).unwrap();

        let case_id = root.allocate_identity();
        let mut case = Case::new(case_id, register, "2024/18");
        case.apply_patch(&CasePatch {
            owner: Some(Some(user)),
            ..CasePatch::default()
        });
        root.insert_case(case).unwrap();

        root.update_case(
            case_id,
            &CasePatch {
                owner: Some(Some(other)),
                ..CasePatch::default()
            },
        )
        .unwrap();

        assert!(root.user(user).unwrap().owned_cases().is_empty());
        assert_eq!(root.user(other).unwrap().owned_cases(), &[case_id]);
    }

    #[test]
    fn dangling_references_are_rejected() {
        let (mut root, register, _unit, _user) = seeded_root();
        let case_id = root.allocate_identity();
        let mut case = Case::new(case_id, register, "2024/19");
        case.apply_patch(&CasePatch {
            unit: Some(Some(Identity::new(4))),
            ..CasePatch::default()
        });
        // Identity 4 is this case itself, not a unit.
        assert!(root.insert_case(case).is_err());

        let orphan = root.allocate_identity();
        let err = root
            .insert_action(Action::new(orphan, Identity::new(4)))
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownIdentity(_)));
    }

    #[test]
    fn document_attaches_to_its_action() {
        let (mut root, register, _unit, _user) = seeded_root();
        let case_id = root.allocate_identity();
        root.insert_case(Case::new(case_id, register, "2024/20"))
            .unwrap();
        let action_id = root.allocate_identity();
        root.insert_action(Action::new(action_id, case_id)).unwrap();
        let doc_id = root.allocate_identity();
        root.insert_document(Document::new(doc_id, action_id, "remiss.pdf"))
            .unwrap();

        assert_eq!(root.action(action_id).unwrap().documents(), &[doc_id]);
        assert_eq!(root.case(case_id).unwrap().actions(), &[action_id]);
    }

    #[test]
    fn entities_enumerates_the_whole_graph() {
        let (mut root, register, _unit, _user) = seeded_root();
        let case_id = root.allocate_identity();
        root.insert_case(Case::new(case_id, register, "2024/21"))
            .unwrap();
        assert_eq!(root.entities().count(), 4);
    }

    #[test]
    fn unit_deactivation_is_soft() {
        let (mut root, _register, unit, _user) = seeded_root();
        root.set_unit_active(unit, false).unwrap();
        let unit = root.unit(unit).unwrap();
        assert!(!unit.is_active());
        assert_eq!(unit.display_value(), "Stadskansliet");
    }
}
