//! Commands: the unit of the history journal.
//!
//! A command is a plain data record whose references (identities,
//! timestamps) are resolved **before** execution. `apply` is a pure function
//! of the command payload and the current root: no clock, no randomness, no
//! external calls. Given the same root and payload it always produces the
//! same resulting root and output, which is what makes the journal
//! replayable.

use chrono::{DateTime, Utc};
use diarium_core::{DomainResult, Identity};
use diarium_domain::{Action, Case, CasePatch, Document, EntityKind, Register, Root, Unit, User};
use serde::{Deserialize, Serialize};

/// A deterministic, serializable mutation of the record graph.
///
/// Journal entries are self-describing: the `kind` tag plus the payload are
/// enough to replay an entry without external schema lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Advance the identity counter. The identity factory is itself a
    /// command so that allocation is part of the replayable history.
    AllocateIdentity,

    CreateRegister {
        identity: Identity,
        name: String,
        source_url: String,
    },

    CreateUnit {
        identity: Identity,
        code: String,
        name: Option<String>,
    },

    /// Soft-deactivation; nothing is ever hard-deleted from the history.
    SetUnitActive {
        identity: Identity,
        active: bool,
    },

    CreateUser {
        identity: Identity,
        signature: String,
        name: Option<String>,
        unit: Option<String>,
        profile_code: Option<String>,
        email: Option<String>,
    },

    CreateCase {
        identity: Identity,
        register: Identity,
        number: String,
        title: Option<String>,
        unit: Option<Identity>,
        owner: Option<Identity>,
        handler: Option<Identity>,
        registrant: Option<Identity>,
        modifier: Option<Identity>,
        modified_at: Option<DateTime<Utc>>,
    },

    UpdateCase {
        identity: Identity,
        patch: CasePatch,
    },

    CreateAction {
        identity: Identity,
        case: Identity,
        note: Option<String>,
        unit: Option<Identity>,
        owner: Option<Identity>,
        modified_at: Option<DateTime<Utc>>,
    },

    CreateDocument {
        identity: Identity,
        action: Identity,
        title: String,
    },
}

impl Command {
    /// Stable command name, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AllocateIdentity => "allocate_identity",
            Command::CreateRegister { .. } => "create_register",
            Command::CreateUnit { .. } => "create_unit",
            Command::SetUnitActive { .. } => "set_unit_active",
            Command::CreateUser { .. } => "create_user",
            Command::CreateCase { .. } => "create_case",
            Command::UpdateCase { .. } => "update_case",
            Command::CreateAction { .. } => "create_action",
            Command::CreateDocument { .. } => "create_document",
        }
    }

    /// Apply this command to the root.
    ///
    /// Validation happens before any mutation, so a rejected command leaves
    /// the root untouched and rejects identically on replay.
    pub(crate) fn apply(&self, root: &mut Root) -> DomainResult<Output> {
        match self {
            Command::AllocateIdentity => Ok(Output::Identity(root.allocate_identity())),

            Command::CreateRegister {
                identity,
                name,
                source_url,
            } => {
                root.insert_register(Register::new(*identity, name, source_url))?;
                Ok(Output::created(EntityKind::Register, *identity))
            }

            Command::CreateUnit {
                identity,
                code,
                name,
            } => {
                root.insert_unit(Unit::new(*identity, code, name.clone()))?;
                Ok(Output::created(EntityKind::Unit, *identity))
            }

            Command::SetUnitActive { identity, active } => {
                root.set_unit_active(*identity, *active)?;
                Ok(Output::updated(EntityKind::Unit, *identity))
            }

            Command::CreateUser {
                identity,
                signature,
                name,
                unit,
                profile_code,
                email,
            } => {
                let user = User::new(*identity, signature).with_details(
                    name.clone(),
                    unit.clone(),
                    profile_code.clone(),
                    email.clone(),
                );
                root.insert_user(user)?;
                Ok(Output::created(EntityKind::User, *identity))
            }

            Command::CreateCase {
                identity,
                register,
                number,
                title,
                unit,
                owner,
                handler,
                registrant,
                modifier,
                modified_at,
            } => {
                let case = Case::new(*identity, *register, number).with_details(
                    title.clone(),
                    *unit,
                    *owner,
                    *handler,
                    *registrant,
                    *modifier,
                    *modified_at,
                );
                root.insert_case(case)?;
                Ok(Output::created(EntityKind::Case, *identity))
            }

            Command::UpdateCase { identity, patch } => {
                root.update_case(*identity, patch)?;
                Ok(Output::updated(EntityKind::Case, *identity))
            }

            Command::CreateAction {
                identity,
                case,
                note,
                unit,
                owner,
                modified_at,
            } => {
                let action = Action::new(*identity, *case).with_details(
                    note.clone(),
                    *unit,
                    *owner,
                    *modified_at,
                );
                root.insert_action(action)?;
                Ok(Output::created(EntityKind::Action, *identity))
            }

            Command::CreateDocument {
                identity,
                action,
                title,
            } => {
                root.insert_document(Document::new(*identity, *action, title))?;
                Ok(Output::created(EntityKind::Document, *identity))
            }
        }
    }
}

/// What a command produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Output {
    /// A freshly allocated identity.
    Identity(Identity),
    /// A new entity entered the graph.
    Created { kind: EntityKind, identity: Identity },
    /// An existing entity was mutated.
    Updated { kind: EntityKind, identity: Identity },
}

impl Output {
    fn created(kind: EntityKind, identity: Identity) -> Self {
        Output::Created { kind, identity }
    }

    fn updated(kind: EntityKind, identity: Identity) -> Self {
        Output::Updated { kind, identity }
    }

    /// The identity this output refers to.
    pub fn identity(&self) -> Identity {
        match self {
            Output::Identity(identity) => *identity,
            Output::Created { identity, .. } | Output::Updated { identity, .. } => *identity,
        }
    }

    /// The entity touched by the command, if any entered or changed in the
    /// graph (identity allocation touches nothing indexable).
    pub fn touched(&self) -> Option<(EntityKind, Identity)> {
        match self {
            Output::Identity(_) => None,
            Output::Created { kind, identity } | Output::Updated { kind, identity } => {
                Some((*kind, *identity))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_entries_are_self_describing() {
        let command = Command::CreateRegister {
            identity: Identity::new(1),
            name: "Diariet".into(),
            source_url: "jdbc:sqlserver://example".into(),
        };
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["kind"], "create_register");
        assert_eq!(json["name"], "Diariet");

        let back: Command = serde_json::from_value(json).unwrap();
        assert_eq!(back, command);
    }

    #[test]
    fn rejected_command_leaves_root_untouched() {
        let mut root = Root::new();
        let before = root.clone();
        let command = Command::CreateCase {
            identity: Identity::new(9),
            register: Identity::new(8),
            number: "2024/1".into(),
            title: None,
            unit: None,
            owner: None,
            handler: None,
            registrant: None,
            modifier: None,
            modified_at: None,
        };
        assert!(command.apply(&mut root).is_err());
        assert_eq!(root, before);
    }

    #[test]
    fn allocate_identity_touches_nothing_indexable() {
        let mut root = Root::new();
        let output = Command::AllocateIdentity.apply(&mut root).unwrap();
        assert_eq!(output.touched(), None);
        assert_eq!(output.identity(), Identity::new(1));
    }
}
