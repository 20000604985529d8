//! Pending write ledger.
//!
//! The ledger holds every locally authored value the remote has not echoed
//! back yet. Entries are created when a mutation is issued and are only ever
//! replaced or removed; the remote stream never edits them.

use crate::{Entity, EntityId, Sequence, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A locally authored value waiting for remote confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWrite {
    /// The full value the remote is expected to converge to
    pub entity: Entity,
    /// Issuance order of the first write for this id
    pub seq: Sequence,
    /// When the latest write for this id was issued
    pub issued_at: Timestamp,
}

/// A local deletion waiting for the remote to drop the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDelete {
    /// Issuance order
    pub seq: Sequence,
    /// When the deletion was issued
    pub issued_at: Timestamp,
}

/// Pending writes and pending deletions for one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    writes: BTreeMap<EntityId, PendingWrite>,
    deletions: BTreeMap<EntityId, PendingDelete>,
    next_seq: Sequence,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> Sequence {
        self.next_seq += 1;
        self.next_seq
    }

    /// Record an optimistic write, replacing any earlier pending value.
    ///
    /// A repeated write for the same id keeps its original sequence so
    /// pending creations do not jump around in display order.
    pub fn record_write(&mut self, entity: Entity, issued_at: Timestamp) -> Sequence {
        self.deletions.remove(&entity.id);

        let seq = match self.writes.get(&entity.id) {
            Some(existing) => existing.seq,
            None => self.next_seq(),
        };

        self.writes.insert(
            entity.id.clone(),
            PendingWrite {
                entity,
                seq,
                issued_at,
            },
        );
        seq
    }

    /// Record an optimistic deletion. Any pending write for the id is dropped.
    pub fn record_delete(&mut self, id: impl Into<EntityId>, issued_at: Timestamp) -> Sequence {
        let id = id.into();
        self.writes.remove(&id);
        let seq = self.next_seq();
        self.deletions.insert(id, PendingDelete { seq, issued_at });
        seq
    }

    /// Get the pending write for an id.
    pub fn write(&self, id: &str) -> Option<&PendingWrite> {
        self.writes.get(id)
    }

    /// Check whether an id is pending deletion.
    pub fn is_deleting(&self, id: &str) -> bool {
        self.deletions.contains_key(id)
    }

    /// Check whether an id has any pending entry.
    pub fn contains(&self, id: &str) -> bool {
        self.writes.contains_key(id) || self.deletions.contains_key(id)
    }

    /// All pending writes, ordered by id.
    pub fn writes(&self) -> impl Iterator<Item = &PendingWrite> {
        self.writes.values()
    }

    /// All pending deletions, ordered by id.
    pub fn deletions(&self) -> impl Iterator<Item = (&EntityId, &PendingDelete)> {
        self.deletions.iter()
    }

    /// Remove a confirmed write.
    pub fn resolve_write(&mut self, id: &str) -> Option<PendingWrite> {
        self.writes.remove(id)
    }

    /// Remove a confirmed deletion.
    pub fn resolve_delete(&mut self, id: &str) -> bool {
        self.deletions.remove(id).is_some()
    }

    /// Drop every pending entry for an id. Returns true if anything was removed.
    pub fn forget(&mut self, id: &str) -> bool {
        let write = self.writes.remove(id).is_some();
        let delete = self.deletions.remove(id).is_some();
        write || delete
    }

    /// Evict entries issued strictly before `cutoff`, returning their ids.
    pub fn evict_older_than(&mut self, cutoff: Timestamp) -> Vec<EntityId> {
        let mut evicted: Vec<EntityId> = self
            .writes
            .iter()
            .filter(|(_, pending)| pending.issued_at < cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        evicted.extend(
            self.deletions
                .iter()
                .filter(|(_, pending)| pending.issued_at < cutoff)
                .map(|(id, _)| id.clone()),
        );

        for id in &evicted {
            self.forget(id);
        }
        evicted
    }

    /// Total number of pending entries.
    pub fn len(&self) -> usize {
        self.writes.len() + self.deletions.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletions.is_empty()
    }
}
