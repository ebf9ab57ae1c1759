//! `diarium-store` — the command-sourced prevalent store.
//!
//! The authoritative history of the record graph is an append-only journal
//! of deterministic [`Command`]s. The in-memory [`Root`] is materialized
//! state only: it can be rebuilt from scratch by loading the newest snapshot
//! and replaying every journal entry appended after it.
//!
//! Write-ahead discipline: a command is durably appended to the journal
//! before it is applied in memory, so a crash between append and apply is
//! recovered by replay on the next [`PrevalentStore::open`].
//!
//! [`Root`]: diarium_domain::Root

pub mod command;
pub mod error;
pub mod journal;
pub mod mutation;
pub mod snapshot;
pub mod store;


pub use command::{Command, Output};
pub use error::{StoreError, StoreResult};
pub use mutation::{Mutation, Subscription};
pub use store::{PrevalentStore, StateView};
