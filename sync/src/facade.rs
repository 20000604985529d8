//! Consumer facade over one synchronized collection.
//!
//! Every expected failure is absorbed here: consumers get `Option`s and
//! `bool`s, and read the reason from [`Collection::last_error`].

use crate::engine::SyncEngine;
use shopfront_engine::{CollectionName, Entity, EntityId, Fields, StateSource, Timestamp};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Immutable published state of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionView {
    /// Collection path
    pub collection: CollectionName,
    /// Visible entities in display order
    pub entities: Vec<Entity>,
    /// True until the first snapshot, or until the cache settles when the
    /// remote is unreachable
    pub is_loading: bool,
    /// Last recorded failure
    pub last_error: Option<String>,
    /// Where the visible base came from
    pub source: StateSource,
    /// Number of unconfirmed ledger entries
    pub pending: usize,
    /// Publication counter, strictly increasing
    pub revision: u64,
}

impl CollectionView {
    pub(crate) fn initial(collection: CollectionName) -> Self {
        Self {
            collection,
            entities: Vec::new(),
            is_loading: true,
            last_error: None,
            source: StateSource::Empty,
            pending: 0,
            revision: 0,
        }
    }

    /// Look up a visible entity.
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Ids in display order.
    pub fn ids(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Handle consumers use to read and mutate a collection.
#[derive(Clone)]
pub struct Collection {
    engine: SyncEngine,
}

impl Collection {
    pub fn new(engine: SyncEngine) -> Self {
        Self { engine }
    }

    /// The engine behind this collection.
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Collection path.
    pub fn name(&self) -> &str {
        self.engine.collection()
    }

    /// Load the cache and open the subscription.
    pub async fn start(&self) {
        self.engine.start().await
    }

    /// Close the subscription. In-flight writes still complete.
    pub fn stop(&self) {
        self.engine.stop()
    }

    /// Current published view.
    pub fn view(&self) -> Arc<CollectionView> {
        self.engine.view()
    }

    /// Visible entities in display order.
    pub fn entities(&self) -> Vec<Entity> {
        self.view().entities.clone()
    }

    /// Current time in milliseconds, as seen by the engine.
    pub fn now(&self) -> Timestamp {
        self.engine.now()
    }

    pub fn is_loading(&self) -> bool {
        self.view().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.view().last_error.clone()
    }

    /// Create an entity with a generated id.
    pub fn create(&self, fields: Fields) -> Option<EntityId> {
        self.engine.create(fields).ok()
    }

    /// Create an entity under a caller-chosen id.
    pub fn create_with_id(&self, id: impl Into<EntityId>, fields: Fields) -> Option<EntityId> {
        self.engine.create_with_id(id, fields).ok()
    }

    /// Merge `fields` into a visible entity.
    pub fn update(&self, id: &str, fields: &Fields) -> bool {
        self.engine.update(id, fields).is_ok()
    }

    /// Update the entity if visible, create it under `id` otherwise.
    pub fn upsert(&self, id: &str, fields: Fields) -> bool {
        if self.get(id).is_some() {
            self.update(id, &fields)
        } else {
            self.create_with_id(id, fields).is_some()
        }
    }

    pub fn delete(&self, id: &str) -> bool {
        self.engine.delete(id).is_ok()
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.engine.get(id)
    }

    /// Record a failure detected above the engine.
    pub fn record_error(&self, message: impl fmt::Display) {
        self.engine.record_error(message)
    }

    /// Receiver notified on every publication.
    pub fn watch(&self) -> watch::Receiver<Arc<CollectionView>> {
        self.engine.watch()
    }

    /// Wait until the collection stops loading.
    pub async fn wait_until_loaded(&self) {
        let mut rx = self.watch();
        let _ = rx.wait_for(|view| !view.is_loading).await;
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name())
            .finish()
    }
}
