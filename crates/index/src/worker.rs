//! Background worker keeping the index current with the store.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use diarium_store::{Mutation, PrevalentStore, Subscription};

use crate::service::IndexService;

/// Handle to control and join the index worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// The index maintenance loop.
///
/// Drains one store subscription on a dedicated thread and applies each
/// mutation to the index via [`IndexService::update`]. Updates are
/// idempotent upserts, so the worker tolerates duplicates and a failed
/// update only costs freshness until the entity is touched again or the
/// index is reconstructed.
#[derive(Debug)]
pub struct IndexWorker;

impl IndexWorker {
    /// Spawn the worker thread.
    ///
    /// The subscription must have been registered before any state the
    /// index should observe was mutated; mutations queue in the channel
    /// until the worker drains them, in commit order.
    pub fn spawn(
        store: Arc<PrevalentStore>,
        index: Arc<IndexService>,
        subscription: Subscription,
    ) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name("index-worker".to_string())
            .spawn(move || worker_loop(&store, &index, &subscription, &shutdown_rx))
            .expect("failed to spawn index worker thread");

        WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn worker_loop(
    store: &PrevalentStore,
    index: &IndexService,
    subscription: &Subscription,
    shutdown_rx: &mpsc::Receiver<()>,
) {
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match subscription.recv_timeout(tick) {
            Ok(Mutation { kind, identity }) => {
                // The read guard is released before the entry is committed;
                // command execution never waits on index I/O.
                let entry = index.entry_for(&store.current_state(), kind, identity);
                if let Err(err) = index.apply(entry) {
                    warn!(%kind, %identity, error = %err, "index update failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("mutation stream closed, index worker stopping");
                break;
            }
        }
    }
}
