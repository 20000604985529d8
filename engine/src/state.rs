//! Collection state - the in-memory container for one synchronized collection.
//!
//! `CollectionState` holds the visible entities, the pending write ledger and
//! the base the ledger is overlaid on. It applies local mutations
//! optimistically and reconciles remote snapshots. It performs no IO; the
//! async runtime around it decides when to call what.

use crate::{
    error::Result, CollectionName, CollectionSchema, Entity, EntityId, Error, Fields, Ledger,
    MergeReport, Reconciler, Snapshot, Timestamp, VolatileFields,
};
use serde::{Deserialize, Serialize};

/// Where the base of the visible state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateSource {
    /// Nothing loaded yet
    Empty,
    /// Local fallback cache (cold start or remote unavailable)
    Cache,
    /// At least one remote snapshot has been applied
    Remote,
}

/// Visible state, ledger and base for one collection.
#[derive(Debug, Clone)]
pub struct CollectionState {
    name: CollectionName,
    schema: Option<CollectionSchema>,
    volatile: VolatileFields,
    base: Snapshot,
    source: StateSource,
    ledger: Ledger,
    visible: Vec<Entity>,
}

impl CollectionState {
    /// Create an empty state for a collection.
    pub fn new(name: impl Into<CollectionName>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            volatile: VolatileFields::default(),
            base: Snapshot::empty(),
            source: StateSource::Empty,
            ledger: Ledger::new(),
            visible: Vec::new(),
        }
    }

    /// Validate every created or updated entity against `schema`.
    pub fn with_schema(mut self, schema: CollectionSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Replace the volatile fields used for confirmation equality.
    pub fn with_volatile_fields(mut self, volatile: VolatileFields) -> Self {
        self.volatile = volatile;
        self
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entities currently exposed, in display order.
    pub fn visible(&self) -> &[Entity] {
        &self.visible
    }

    /// Look up a visible entity.
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.visible.iter().find(|e| e.id == id)
    }

    /// The pending write ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Where the base came from.
    pub fn source(&self) -> StateSource {
        self.source
    }

    /// Check whether a remote snapshot has been applied.
    pub fn has_snapshot(&self) -> bool {
        self.source == StateSource::Remote
    }

    /// Use cached entities as the base until the first remote snapshot.
    ///
    /// Returns false (and changes nothing) once a snapshot has been applied,
    /// since the cache is never authoritative over the remote.
    pub fn load_cache(&mut self, entities: Vec<Entity>) -> bool {
        if self.has_snapshot() {
            return false;
        }
        self.base = Snapshot::new(entities);
        self.source = StateSource::Cache;
        self.recompute();
        true
    }

    /// Reconcile a remote snapshot with the ledger.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> MergeReport {
        let outcome = Reconciler::new(&self.volatile).reconcile(&snapshot, &self.ledger);
        self.base = snapshot;
        self.source = StateSource::Remote;
        self.ledger = outcome.ledger;
        self.visible = outcome.visible;
        outcome.report
    }

    /// Optimistically create an entity.
    pub fn create(
        &mut self,
        id: impl Into<EntityId>,
        fields: Fields,
        now: Timestamp,
    ) -> Result<&Entity> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::EmptyId);
        }
        if self.get(&id).is_some() {
            return Err(Error::EntityAlreadyExists(id));
        }
        self.validate(&fields)?;

        self.ledger.record_write(Entity::new(id.clone(), fields, now), now);
        self.recompute();
        self.get(&id).ok_or(Error::EntityNotFound(id))
    }

    /// Optimistically merge `partial` into a visible entity.
    ///
    /// Returns the full new value, which is what the remote should converge to.
    pub fn update(&mut self, id: &str, partial: &Fields, now: Timestamp) -> Result<Entity> {
        let mut entity = self
            .get(id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound(id.to_string()))?;
        entity.merge_fields(partial, now);
        self.validate(&entity.fields)?;

        self.ledger.record_write(entity.clone(), now);
        self.recompute();
        Ok(entity)
    }

    /// Optimistically delete a visible entity.
    pub fn delete(&mut self, id: &str, now: Timestamp) -> Result<()> {
        if self.get(id).is_none() {
            return Err(Error::EntityNotFound(id.to_string()));
        }
        self.ledger.record_delete(id, now);
        self.recompute();
        Ok(())
    }

    /// Drop the pending entry for an id and fall back to the base value.
    ///
    /// Returns false if nothing was pending.
    pub fn revert(&mut self, id: &str) -> bool {
        if !self.ledger.forget(id) {
            return false;
        }
        self.recompute();
        true
    }

    /// Evict ledger entries issued before `cutoff` and fall back to the base
    /// value for each of them.
    pub fn evict_stale(&mut self, cutoff: Timestamp) -> Vec<EntityId> {
        let evicted = self.ledger.evict_older_than(cutoff);
        if !evicted.is_empty() {
            self.recompute();
        }
        evicted
    }

    /// Check whether `entity` still is the pending value for its id.
    ///
    /// A later local mutation replaces the pending value; a failed write of
    /// an older value must not revert the newer one.
    pub fn is_pending_value(&self, entity: &Entity) -> bool {
        self.ledger
            .write(&entity.id)
            .is_some_and(|pending| pending.entity == *entity)
    }

    fn validate(&self, fields: &Fields) -> Result<()> {
        match &self.schema {
            Some(schema) => schema.validate_fields(fields),
            None => Ok(()),
        }
    }

    fn recompute(&mut self) {
        self.visible = Reconciler::new(&self.volatile).overlay(&self.base, &self.ledger);
    }
}
