//! A list mirrored to a [`KeyValueStore`] under one key.
//!
//! Lifecycle is `Uninitialized -> Loading -> Ready`. Mutations that arrive
//! before `Ready` are queued and replayed on top of the loaded data, so an
//! early write can never clobber what is on disk.
//!
//! Every mutation publishes a JSON snapshot on a `watch` channel. A single
//! writer task per list drains it, so writes are serialized and a burst of
//! mutations collapses into the latest snapshot.

use crate::storage::KeyValueStore;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use skycast_core::StorageError;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Loading,
    Ready,
}

type Mutation<T> = Box<dyn FnOnce(&mut Vec<T>) + Send>;

struct Inner<T> {
    state: StoreState,
    items: Vec<T>,
    pending: Vec<Mutation<T>>,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    generation: u64,
    json: String,
}

pub struct PersistedList<T> {
    key: &'static str,
    store: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner<T>>,
    normalize: fn(&mut Vec<T>),
    snapshots: watch::Sender<Snapshot>,
    written: watch::Receiver<u64>,
}

impl<T> PersistedList<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    /// Create the list and spawn its writer task.
    ///
    /// `normalize` runs on loaded data before it becomes visible.
    /// Must be called from within a tokio runtime.
    pub fn new(key: &'static str, store: Arc<dyn KeyValueStore>, normalize: fn(&mut Vec<T>)) -> Self {
        let (snapshots, snapshot_rx) = watch::channel(Snapshot::default());
        let (written_tx, written) = watch::channel(0u64);

        tokio::spawn(run_writer(key, store.clone(), snapshot_rx, written_tx));

        Self {
            key,
            store,
            inner: Mutex::new(Inner {
                state: StoreState::Uninitialized,
                items: Vec::new(),
                pending: Vec::new(),
                generation: 0,
            }),
            normalize,
            snapshots,
            written,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn state(&self) -> StoreState {
        self.inner.lock().state
    }

    /// Read persisted data once. Later calls are no-ops.
    ///
    /// Read failures and malformed data both leave the list empty.
    pub async fn load(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.state != StoreState::Uninitialized {
                return;
            }
            inner.state = StoreState::Loading;
        }

        let mut loaded: Vec<T> = match self.store.get(self.key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(items) => items,
                Err(e) => {
                    let err = StorageError::corruption(self.key, e);
                    tracing::warn!(key = self.key, "Discarding stored data: {}", err);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!(key = self.key, "Failed to load stored data: {}", e);
                Vec::new()
            }
        };
        (self.normalize)(&mut loaded);

        let mut inner = self.inner.lock();
        inner.items = loaded;
        let pending = std::mem::take(&mut inner.pending);
        let replayed = pending.len();
        for mutation in pending {
            mutation(&mut inner.items);
        }
        inner.state = StoreState::Ready;

        if replayed > 0 {
            tracing::debug!(key = self.key, replayed, "Replayed queued mutations");
            self.publish(&mut inner);
        }

        tracing::info!(key = self.key, count = inner.items.len(), "Loaded stored list");
    }

    /// Apply `mutation`, persist the list and return what the mutation returned.
    ///
    /// Returns `None` when the list is not loaded yet and the mutation was
    /// queued instead. A queued mutation's result is discarded on replay.
    pub fn update<R>(&self, mutation: impl FnOnce(&mut Vec<T>) -> R + Send + 'static) -> Option<R> {
        let mut inner = self.inner.lock();
        if inner.state != StoreState::Ready {
            inner.pending.push(Box::new(move |items: &mut Vec<T>| {
                mutation(items);
            }));
            return None;
        }

        let result = mutation(&mut inner.items);
        self.publish(&mut inner);
        Some(result)
    }

    pub fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.lock().items)
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.inner.lock().items.clone()
    }

    /// Wait until the latest published snapshot has been handed to the store
    pub async fn flush(&self) {
        let target = self.inner.lock().generation;
        let mut written = self.written.clone();
        if written.wait_for(|g| *g >= target).await.is_err() {
            tracing::warn!(key = self.key, "Writer stopped before flush completed");
        }
    }

    fn publish(&self, inner: &mut Inner<T>) {
        let json = match serde_json::to_string(&inner.items) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = self.key, "Failed to serialize list: {}", e);
                return;
            }
        };
        inner.generation += 1;
        self.snapshots.send_replace(Snapshot {
            generation: inner.generation,
            json,
        });
    }
}

async fn run_writer(
    key: &'static str,
    store: Arc<dyn KeyValueStore>,
    mut snapshots: watch::Receiver<Snapshot>,
    written: watch::Sender<u64>,
) {
    while snapshots.changed().await.is_ok() {
        let Snapshot { generation, json } = snapshots.borrow_and_update().clone();
        if let Err(e) = store.set(key, json).await {
            // In-memory state stays authoritative for the session
            tracing::error!(key, "Failed to persist list: {}", e);
        }
        written.send_replace(generation);
    }
    tracing::debug!(key, "Writer task finished");
}
