//! External-source synchronization.
//!
//! Each register points at an external system (its `source_url`). An
//! [`ExternalSource`] produces a batch of records for a register; the sync
//! pass turns the batch into commands against the store, resolving record
//! keys (unit codes, user signatures, case numbers) to identities in the
//! live graph. Every register synchronizes on its own named thread, and one
//! register's failure never aborts the others.

use std::sync::Arc;
use std::thread;

use tracing::{error, info};

use diarium_core::{Entity, Identity};
use diarium_domain::{EntityRef, Register, Root};
use diarium_store::{Command, PrevalentStore};

use crate::error::SyncError;

/// A connector to the external system behind one register.
///
/// Implementations fetch whatever the source holds for the register; the
/// sync pass makes the application idempotent, so a source may return the
/// same records on every call.
pub trait ExternalSource: Send + Sync + 'static {
    fn fetch(&self, register: &RegisterHandle) -> Result<SourceBatch, SyncError>;
}

/// The register being synchronized, detached from the live graph so the
/// source can be called without holding any store lock.
#[derive(Debug, Clone)]
pub struct RegisterHandle {
    pub identity: Identity,
    pub name: String,
    pub source_url: String,
}

impl RegisterHandle {
    fn from_register(register: &Register) -> Self {
        Self {
            identity: register.identity(),
            name: register.name().to_owned(),
            source_url: register.source_url().to_owned(),
        }
    }
}

/// One fetched batch. Units and users are shared vocabulary and applied
/// first; cases own their actions, which own their documents.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub units: Vec<UnitRecord>,
    pub users: Vec<UserRecord>,
    pub cases: Vec<CaseRecord>,
}

#[derive(Debug, Clone)]
pub struct UnitRecord {
    pub code: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub signature: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub number: String,
    pub title: Option<String>,
    /// Unit code, resolved against the graph after units are applied.
    pub unit: Option<String>,
    /// Owner signature, resolved the same way.
    pub owner: Option<String>,
    pub actions: Vec<ActionRecord>,
}

#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub note: Option<String>,
    pub unit: Option<String>,
    pub documents: Vec<DocumentRecord>,
}

#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub title: String,
}

/// Spawn one sync thread per register. Threads run a single fetch-and-apply
/// pass and exit; failures are logged against the failing register only.
pub(crate) fn spawn_register_sync(
    store: &Arc<PrevalentStore>,
    source: &Arc<dyn ExternalSource>,
) -> Vec<thread::JoinHandle<()>> {
    let registers: Vec<RegisterHandle> = store
        .current_state()
        .registers()
        .map(RegisterHandle::from_register)
        .collect();

    registers
        .into_iter()
        .map(|register| {
            let store = Arc::clone(store);
            let source = Arc::clone(source);
            let name = format!("sync-{}", register.name);
            thread::Builder::new()
                .name(name.clone())
                .spawn(move || match sync_register(&store, &*source, &register) {
                    Ok(applied) => {
                        info!(register = %register.name, applied, "register synchronized");
                    }
                    Err(err) => {
                        error!(register = %register.name, error = %err, "register sync failed");
                    }
                })
                .unwrap_or_else(|e| panic!("failed to spawn sync thread {name}: {e}"))
        })
        .collect()
}

/// One fetch-and-apply pass for a register. Returns the number of commands
/// applied.
pub fn sync_register(
    store: &PrevalentStore,
    source: &dyn ExternalSource,
    register: &RegisterHandle,
) -> Result<usize, SyncError> {
    let batch = source.fetch(register)?;
    let mut applied = 0usize;

    for unit in &batch.units {
        if find_unit(&store.current_state(), &unit.code).is_none() {
            let identity = store.execute(Command::AllocateIdentity)?.identity();
            store.execute(Command::CreateUnit {
                identity,
                code: unit.code.clone(),
                name: unit.name.clone(),
            })?;
            applied += 1;
        }
    }

    for user in &batch.users {
        if find_user(&store.current_state(), &user.signature).is_none() {
            let identity = store.execute(Command::AllocateIdentity)?.identity();
            store.execute(Command::CreateUser {
                identity,
                signature: user.signature.clone(),
                name: user.name.clone(),
                unit: None,
                profile_code: None,
                email: user.email.clone(),
            })?;
            applied += 1;
        }
    }

    for case in &batch.cases {
        // Existing cases are left alone; the source has no stable per-action
        // key to reconcile against, so only whole new cases are imported.
        if find_case(&store.current_state(), register.identity, &case.number).is_some() {
            continue;
        }
        applied += apply_case(store, register, case)?;
    }

    Ok(applied)
}

fn apply_case(
    store: &PrevalentStore,
    register: &RegisterHandle,
    record: &CaseRecord,
) -> Result<usize, SyncError> {
    let mut applied = 0usize;

    let (unit, owner) = {
        let state = store.current_state();
        (
            record.unit.as_deref().and_then(|code| find_unit(&state, code)),
            record.owner.as_deref().and_then(|sig| find_user(&state, sig)),
        )
    };

    let case = store.execute(Command::AllocateIdentity)?.identity();
    store.execute(Command::CreateCase {
        identity: case,
        register: register.identity,
        number: record.number.clone(),
        title: record.title.clone(),
        unit,
        owner,
        handler: None,
        registrant: None,
        modifier: None,
        modified_at: None,
    })?;
    applied += 1;

    for action_record in &record.actions {
        let unit = {
            let state = store.current_state();
            action_record.unit.as_deref().and_then(|code| find_unit(&state, code))
        };
        let action = store.execute(Command::AllocateIdentity)?.identity();
        store.execute(Command::CreateAction {
            identity: action,
            case,
            note: action_record.note.clone(),
            unit,
            owner: None,
            modified_at: None,
        })?;
        applied += 1;

        for document in &action_record.documents {
            let identity = store.execute(Command::AllocateIdentity)?.identity();
            store.execute(Command::CreateDocument {
                identity,
                action,
                title: document.title.clone(),
            })?;
            applied += 1;
        }
    }

    Ok(applied)
}

fn find_unit(root: &Root, code: &str) -> Option<Identity> {
    root.entities().find_map(|entity| match entity {
        EntityRef::Unit(unit) if unit.code() == code => Some(unit.identity()),
        _ => None,
    })
}

fn find_user(root: &Root, signature: &str) -> Option<Identity> {
    root.entities().find_map(|entity| match entity {
        EntityRef::User(user) if user.signature() == signature => Some(user.identity()),
        _ => None,
    })
}

fn find_case(root: &Root, register: Identity, number: &str) -> Option<Identity> {
    root.entities().find_map(|entity| match entity {
        EntityRef::Case(case) if case.register() == register && case.number() == number => {
            Some(case.identity())
        }
        _ => None,
    })
}
