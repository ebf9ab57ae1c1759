//! The prevalent store: single writer over the command journal.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, RwLock, RwLockReadGuard};

use diarium_domain::Root;
use tracing::{debug, info};

use crate::command::{Command, Output};
use crate::error::{StoreError, StoreResult};
use crate::journal::{self, Journal, JournalEntry};
use crate::mutation::{Mutation, Subscription};
use crate::snapshot;

/// The command-sourced store around [`Root`].
///
/// Exactly one instance applies commands, one at a time, in submission
/// order: the journal mutex is the mutual-exclusion section around the
/// append-and-apply step. Readers take the root lock concurrently and
/// observe either the pre- or post-mutation state, never a partial one.
#[derive(Debug)]
pub struct PrevalentStore {
    dir: PathBuf,
    root: RwLock<Root>,
    writer: Mutex<Writer>,
    subscribers: Mutex<Vec<Sender<Mutation>>>,
    closed: AtomicBool,
}

#[derive(Debug)]
struct Writer {
    journal: Journal,
    next_seq: u64,
}

impl PrevalentStore {
    /// Open the store: restore the newest snapshot (if present), replay
    /// every journal entry appended after it in order, then open a fresh
    /// journal segment. First run starts from an empty root.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_owned();
        std::fs::create_dir_all(&dir)?;

        let (mut last_seq, mut root) = match snapshot::load_latest(&dir)? {
            Some((seq, root)) => {
                info!(seq, "restored snapshot");
                (seq, root)
            }
            None => (0, Root::new()),
        };

        let entries = journal::read_entries(&dir, last_seq)?;
        let replayed = entries.len();
        for entry in entries {
            match entry.command.apply(&mut root) {
                Ok(_) => {}
                // A journaled command that the domain rejected fails the
                // same way on every replay; it contributed nothing to the
                // root the first time either.
                Err(e) => debug!(seq = entry.seq, command = entry.command.name(), error = %e,
                    "replayed command was deterministically rejected"),
            }
            last_seq = entry.seq;
        }
        if replayed > 0 {
            info!(replayed, last_seq, "journal replay complete");
        }

        let journal = Journal::create(&dir, last_seq + 1)?;
        Ok(Self {
            dir,
            root: RwLock::new(root),
            writer: Mutex::new(Writer {
                journal,
                next_seq: last_seq + 1,
            }),
            subscribers: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Execute a command: durably journal it, apply it to the root, then
    /// notify subscribers. The caller observes the output only after the
    /// entry is on disk.
    pub fn execute(&self, command: Command) -> StoreResult<Output> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::StoreClosed);
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::internal("writer lock poisoned"))?;
        // Re-check under the lock so close() cannot race a writer.
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::StoreClosed);
        }

        let seq = writer.next_seq;
        writer.journal.append(&JournalEntry {
            seq,
            command: command.clone(),
        })?;
        // The sequence number is consumed even if the domain rejects the
        // command below: the entry is already durable.
        writer.next_seq += 1;

        let output = {
            let mut root = self
                .root
                .write()
                .map_err(|_| StoreError::internal("root lock poisoned"))?;
            command.apply(&mut root)?
        };
        debug!(seq, command = command.name(), "command committed");
        // Published while still holding the writer lock so subscribers see
        // mutations in commit order.
        if let Some((kind, identity)) = output.touched() {
            self.publish(Mutation { kind, identity });
        }
        drop(writer);
        Ok(output)
    }

    /// Read-only view of the authoritative root. Callers must not hold the
    /// view across long waits; it blocks the writer.
    pub fn current_state(&self) -> StateView<'_> {
        StateView(self.root.read().unwrap_or_else(|poison| poison.into_inner()))
    }

    /// Subscribe to committed mutations, in commit order.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(tx);
        Subscription::new(rx)
    }

    /// Write a snapshot of the current root so the next `open` replays only
    /// entries committed after it.
    pub fn snapshot(&self) -> StoreResult<u64> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::internal("writer lock poisoned"))?;
        let seq = writer.next_seq - 1;
        let root = self
            .root
            .read()
            .map_err(|_| StoreError::internal("root lock poisoned"))?
            .clone();
        drop(writer);
        snapshot::write(&self.dir, seq, &root)?;
        info!(seq, "snapshot written");
        Ok(seq)
    }

    /// Flush pending journal writes and shut the store. Subsequent
    /// `execute` calls fail with [`StoreError::StoreClosed`]; subscriber
    /// channels disconnect so workers drain and stop.
    pub fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::internal("writer lock poisoned"))?;
        writer.journal.sync()?;
        self.subscribers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clear();
        info!("store closed");
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    fn publish(&self, mutation: Mutation) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        // Drop subscribers whose receiver is gone.
        subscribers.retain(|tx| tx.send(mutation).is_ok());
    }
}

/// Read guard over the authoritative [`Root`].
///
/// Dereferences to `Root`; the view is a reference into live state, not a
/// copy, and must not be mutated or held for long.
#[derive(Debug)]
pub struct StateView<'a>(RwLockReadGuard<'a, Root>);

impl std::ops::Deref for StateView<'_> {
    type Target = Root;

    fn deref(&self) -> &Root {
        &self.0
    }
}
