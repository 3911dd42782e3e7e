//! Autosave
//!
//! Connects a [`TaskStore`] to a [`TaskPersistence`]: loads the stored list
//! into the store, then writes the latest snapshot back after every change.
//! Storage failures never reach the store; they are logged and published on
//! the [`StorageEvent`] channel.
//!
//! Saves run one at a time and always write the newest snapshot. Rapid
//! mutations may therefore be coalesced into a single write, and only the
//! last write that completes before the process exits is durable.

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::storage::{KeyValueStorage, TaskPersistence};
use crate::task::{Hydrated, TaskSnapshot, TaskStore};

/// How the initial load ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A stored list was found and decoded
    Loaded { count: usize },
    /// Nothing stored yet
    Absent,
    /// The stored list could not be read; the store started empty
    Failed { message: String },
}

/// Status notices published by the autosave worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    Saved { revision: u64, count: usize },
    SaveFailed { revision: u64, message: String },
}

/// Running autosave for one store
///
/// Dropping it stops the worker without flushing; use
/// [`Autosave::shutdown`] to write out pending changes first.
pub struct Autosave {
    store: TaskStore,
    load_outcome: LoadOutcome,
    events: broadcast::Sender<StorageEvent>,
    settled: watch::Receiver<u64>,
    shutdown: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Autosave {
    /// Load the stored list into `store` and start saving its changes.
    ///
    /// The store is `Loading` until the read finishes and `Ready` when this
    /// returns. No write is issued before the read completes. Must be
    /// called from within a tokio runtime.
    pub async fn start<S>(store: TaskStore, persistence: TaskPersistence<S>) -> Self
    where
        S: KeyValueStorage + 'static,
    {
        store.begin_loading();

        let (loaded, load_outcome) = match persistence.load().await {
            Ok(Some(tasks)) => {
                let count = tasks.len();
                (tasks, LoadOutcome::Loaded { count })
            }
            Ok(None) => (Vec::new(), LoadOutcome::Absent),
            Err(e) => {
                warn!("Failed to load tasks, starting empty: {}", e);
                (
                    Vec::new(),
                    LoadOutcome::Failed {
                        message: e.to_string(),
                    },
                )
            }
        };

        // Subscribe before hydrating so no later change can be missed
        let rx = store.subscribe();
        let hydrated = store.hydrate(loaded);
        info!(
            "Autosave started for key {:?} ({:?})",
            persistence.key(),
            load_outcome
        );

        let (events, _) = broadcast::channel(64);
        let (settled_tx, settled) = watch::channel(0);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = tokio::spawn(run_worker(
            rx,
            persistence,
            hydrated,
            events.clone(),
            settled_tx,
            shutdown_rx,
        ));

        Self {
            store,
            load_outcome,
            events,
            settled,
            shutdown: Some(shutdown_tx),
            worker: Some(worker),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    /// Subscribe to save results from now on
    pub fn events(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    /// Highest revision whose save has been attempted
    pub fn settled_revision(&self) -> u64 {
        *self.settled.borrow()
    }

    /// Wait until the store's current revision has been saved or has failed
    /// to save.
    pub async fn flush(&self) {
        let target = self.store.revision();
        let mut settled = self.settled.clone();
        if settled.wait_for(|revision| *revision >= target).await.is_err() {
            debug!("Autosave worker gone before revision {} settled", target);
        }
    }

    /// Flush pending changes and stop the worker
    pub async fn shutdown(mut self) {
        self.flush().await;
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!("Autosave worker ended abnormally: {}", e);
            }
        }
        debug!("Autosave stopped");
    }
}

async fn run_worker<S>(
    mut rx: watch::Receiver<TaskSnapshot>,
    persistence: TaskPersistence<S>,
    hydrated: Hydrated,
    events: broadcast::Sender<StorageEvent>,
    settled: watch::Sender<u64>,
    mut shutdown: oneshot::Receiver<()>,
) where
    S: KeyValueStorage,
{
    let initial = rx.borrow_and_update().clone();
    if hydrated.replayed > 0 || initial.revision != hydrated.revision {
        save_snapshot(&persistence, &initial, &events, &settled).await;
    } else {
        // Storage already holds exactly what was loaded
        settled.send_replace(initial.revision);
    }

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                save_snapshot(&persistence, &snapshot, &events, &settled).await;
            }
            _ = &mut shutdown => break,
        }
    }
}

async fn save_snapshot<S>(
    persistence: &TaskPersistence<S>,
    snapshot: &TaskSnapshot,
    events: &broadcast::Sender<StorageEvent>,
    settled: &watch::Sender<u64>,
) where
    S: KeyValueStorage,
{
    let event = match persistence.save(&snapshot.tasks).await {
        Ok(()) => StorageEvent::Saved {
            revision: snapshot.revision,
            count: snapshot.tasks.len(),
        },
        Err(e) => {
            error!(revision = snapshot.revision, "Failed to save tasks: {}", e);
            StorageEvent::SaveFailed {
                revision: snapshot.revision,
                message: e.to_string(),
            }
        }
    };
    // No subscribers is fine
    let _ = events.send(event);
    settled.send_replace(snapshot.revision);
}
