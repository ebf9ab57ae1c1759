//! Mutation notifications for index maintenance.
//!
//! After a command commits, the store publishes which entity was touched.
//! Subscriptions are mpsc channels: a single consumer draining one
//! subscription observes mutations in exactly the order the commands
//! committed.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use diarium_core::Identity;
use diarium_domain::EntityKind;

/// One committed graph mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub kind: EntityKind,
    pub identity: Identity,
}

/// A subscription to the store's mutation stream.
///
/// Designed for single-threaded consumption; the index worker owns one.
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<Mutation>,
}

impl Subscription {
    pub(crate) fn new(receiver: Receiver<Mutation>) -> Self {
        Self { receiver }
    }

    /// Try to receive a mutation without blocking.
    pub fn try_recv(&self) -> Result<Mutation, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a mutation.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Mutation, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
