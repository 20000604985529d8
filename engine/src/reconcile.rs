//! Reconciliation of remote snapshots with the pending write ledger.
//!
//! This is the core of determinism. Given the latest remote snapshot and the
//! ledger, this module produces the next visible state and the next ledger.
//!
//! # Algorithm
//!
//! 1. Walk the snapshot in order. For each entity with a pending write,
//!    compare field-wise ignoring volatile fields: equal means confirmed
//!    (emit the remote record, drop the pending entry), different means the
//!    local value wins (emit it, keep the entry).
//! 2. Entities pending deletion are skipped while the snapshot still has them.
//! 3. Pending deletions whose id is absent from the snapshot are confirmed.
//! 4. Pending writes absent from the snapshot are creations the remote has
//!    not seen yet: they are emitted first, most recent first, and kept.
//!
//! Running the merge again on its own output ledger with the same snapshot
//! yields the same visible state and ledger.

use crate::{Entity, EntityId, Ledger, Snapshot, VolatileFields};
use serde::{Deserialize, Serialize};

/// What a merge did, by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Pending writes the snapshot confirmed
    pub confirmed: Vec<EntityId>,
    /// Pending writes that differ from the snapshot and stay visible
    pub overridden: Vec<EntityId>,
    /// Pending writes the snapshot does not contain yet
    pub pending_creates: Vec<EntityId>,
    /// Pending deletions the snapshot confirmed
    pub deletions_confirmed: Vec<EntityId>,
    /// Snapshot entities hidden by a pending deletion
    pub deletions_pending: Vec<EntityId>,
}

impl MergeReport {
    /// Check if the merge changed nothing in the ledger.
    pub fn is_quiet(&self) -> bool {
        self.confirmed.is_empty() && self.deletions_confirmed.is_empty()
    }
}

/// Result of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Entities to expose, in display order
    pub visible: Vec<Entity>,
    /// Ledger after resolving confirmed entries
    pub ledger: Ledger,
    /// Per-id details
    pub report: MergeReport,
}

/// Merges snapshots with a ledger under a fixed equality rule.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    volatile: &'a VolatileFields,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler that ignores `volatile` fields when comparing.
    pub fn new(volatile: &'a VolatileFields) -> Self {
        Self { volatile }
    }

    /// Merge `snapshot` with `ledger`.
    pub fn reconcile(&self, snapshot: &Snapshot, ledger: &Ledger) -> MergeOutcome {
        let mut next = ledger.clone();
        let mut report = MergeReport::default();
        let mut from_snapshot = Vec::with_capacity(snapshot.len());

        for remote in snapshot.entities() {
            if ledger.is_deleting(&remote.id) {
                report.deletions_pending.push(remote.id.clone());
                continue;
            }

            match ledger.write(&remote.id) {
                Some(pending) if pending.entity.field_eq(remote, self.volatile) => {
                    next.resolve_write(&remote.id);
                    report.confirmed.push(remote.id.clone());
                    from_snapshot.push(remote.clone());
                }
                Some(pending) => {
                    report.overridden.push(remote.id.clone());
                    from_snapshot.push(pending.entity.clone());
                }
                None => from_snapshot.push(remote.clone()),
            }
        }

        for (id, _) in ledger.deletions() {
            if !snapshot.contains(id) {
                next.resolve_delete(id);
                report.deletions_confirmed.push(id.clone());
            }
        }

        let mut unseen: Vec<_> = ledger
            .writes()
            .filter(|pending| !snapshot.contains(&pending.entity.id))
            .collect();
        unseen.sort_by(|a, b| b.seq.cmp(&a.seq));

        let mut visible = Vec::with_capacity(unseen.len() + from_snapshot.len());
        for pending in unseen {
            report.pending_creates.push(pending.entity.id.clone());
            visible.push(pending.entity.clone());
        }
        visible.extend(from_snapshot);

        MergeOutcome {
            visible,
            ledger: next,
            report,
        }
    }

    /// Visible state for `base` with every pending entry applied, without
    /// resolving anything.
    ///
    /// Used after local mutations and over the cold-start cache, where a
    /// match must not count as remote confirmation.
    pub fn overlay(&self, base: &Snapshot, ledger: &Ledger) -> Vec<Entity> {
        self.reconcile(base, ledger).visible
    }
}

/// Merge `snapshot` with `ledger` using the default volatile fields.
pub fn merge(snapshot: &Snapshot, ledger: &Ledger) -> MergeOutcome {
    let volatile = VolatileFields::default();
    Reconciler::new(&volatile).reconcile(snapshot, ledger)
}
