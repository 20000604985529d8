//! In-process remote store.
//!
//! Keeps documents per collection in insertion order, stamps a server
//! `updatedAt` on every write and broadcasts the full snapshot to every
//! subscriber after each change. Failure injection covers going offline,
//! rejecting writes, denying collections and holding back deliveries.

use super::{RemoteStore, SnapshotStream};
use crate::error::RemoteError;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::json;
use shopfront_engine::{CollectionName, Entity, Fields, Snapshot, Timestamp};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

type SnapshotSender = mpsc::UnboundedSender<Result<Snapshot, RemoteError>>;

#[derive(Debug)]
struct Subscriber {
    collection: CollectionName,
    sender: SnapshotSender,
}

/// Remote store living in process memory.
#[derive(Debug)]
pub struct MemoryRemote {
    documents: DashMap<CollectionName, Vec<Entity>>,
    subscribers: DashMap<Uuid, Subscriber>,
    denied: DashSet<CollectionName>,
    online: AtomicBool,
    reject_writes: AtomicBool,
    paused: AtomicBool,
    write_delay: Mutex<Duration>,
    server_time: AtomicU64,
    writes: AtomicUsize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// Create an empty, online remote.
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            subscribers: DashMap::new(),
            denied: DashSet::new(),
            online: AtomicBool::new(true),
            reject_writes: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            write_delay: Mutex::new(Duration::ZERO),
            server_time: AtomicU64::new(1_000_000),
            writes: AtomicUsize::new(0),
        }
    }

    /// Replace the documents of a collection and notify subscribers.
    pub fn seed(&self, collection: &str, entities: Vec<Entity>) {
        let entities = Snapshot::new(entities).into_entities();
        self.documents.insert(collection.to_string(), entities);
        self.broadcast(collection);
    }

    /// Current documents of a collection.
    pub fn documents(&self, collection: &str) -> Vec<Entity> {
        self.documents
            .get(collection)
            .map(|docs| docs.value().clone())
            .unwrap_or_default()
    }

    /// Look up one document.
    pub fn document(&self, collection: &str, id: &str) -> Option<Entity> {
        self.documents
            .get(collection)
            .and_then(|docs| docs.iter().find(|e| e.id == id).cloned())
    }

    /// Deliver an arbitrary snapshot without touching stored documents.
    ///
    /// Simulates a snapshot computed before a write landed.
    pub fn push_snapshot(&self, collection: &str, entities: Vec<Entity>) {
        let snapshot = Snapshot::new(entities);
        self.send(collection, Ok(snapshot));
    }

    /// Deliver a stream error to every subscriber of `collection`.
    pub fn push_error(&self, collection: &str, error: RemoteError) {
        self.send(collection, Err(error));
    }

    /// Take the remote on or off line. Going back online redelivers snapshots.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if online {
            self.broadcast_all();
        }
    }

    /// Deny subscriptions to `collection`.
    pub fn deny(&self, collection: &str) {
        self.denied.insert(collection.to_string());
    }

    /// Reject every subsequent write and delete.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Delay every write and delete by `delay`.
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock() = delay;
    }

    /// Hold back snapshot deliveries until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resume deliveries and send every subscriber the current snapshot.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.broadcast_all();
    }

    /// Number of live subscriptions to `collection`.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.prune();
        self.subscribers
            .iter()
            .filter(|s| s.collection == collection)
            .count()
    }

    /// Number of writes and deletes accepted so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn tick(&self) -> Timestamp {
        self.server_time.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn snapshot_of(&self, collection: &str) -> Snapshot {
        Snapshot::new(self.documents(collection))
    }

    fn broadcast(&self, collection: &str) {
        if self.paused.load(Ordering::SeqCst) || !self.online.load(Ordering::SeqCst) {
            return;
        }
        let snapshot = self.snapshot_of(collection);
        self.send(collection, Ok(snapshot));
    }

    fn broadcast_all(&self) {
        let collections: BTreeSet<CollectionName> = self
            .subscribers
            .iter()
            .map(|s| s.collection.clone())
            .collect();
        for collection in collections {
            self.broadcast(&collection);
        }
    }

    fn send(&self, collection: &str, item: Result<Snapshot, RemoteError>) {
        self.subscribers
            .retain(|_, s| s.collection != collection || s.sender.send(item.clone()).is_ok());
    }

    fn prune(&self) {
        self.subscribers.retain(|_, s| !s.sender.is_closed());
    }

    async fn before_write(&self) -> Result<(), RemoteError> {
        let delay = *self.write_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("remote is offline".into()));
        }
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected("writes are rejected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn subscribe(&self, collection: &str) -> Result<SnapshotStream, RemoteError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("remote is offline".into()));
        }
        if self.denied.contains(collection) {
            return Err(RemoteError::PermissionDenied(collection.to_string()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        if !self.paused.load(Ordering::SeqCst) {
            let _ = sender.send(Ok(self.snapshot_of(collection)));
        }
        self.subscribers.insert(
            Uuid::new_v4(),
            Subscriber {
                collection: collection.to_string(),
                sender,
            },
        );
        tracing::debug!(collection = %collection, "subscription opened");

        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|item| (item, receiver))
        });
        Ok(stream.boxed())
    }

    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError> {
        self.before_write().await?;

        let now = self.tick();
        {
            let mut docs = self.documents.entry(collection.to_string()).or_default();
            match docs.iter_mut().find(|e| e.id == id) {
                Some(existing) => existing.merge_fields(&fields, now),
                None => {
                    let mut entity = Entity::new(id, fields, now);
                    entity.fields.insert("createdAt".into(), json!(now));
                    docs.push(entity);
                }
            }
            if let Some(entity) = docs.iter_mut().find(|e| e.id == id) {
                entity.fields.insert("updatedAt".into(), json!(now));
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.broadcast(collection);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.before_write().await?;

        if let Some(mut docs) = self.documents.get_mut(collection) {
            docs.retain(|e| e.id != id);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.broadcast(collection);
        Ok(())
    }
}
