//! # Shopfront Engine
//!
//! A deterministic reconciliation core for optimistic, locally cached
//! application state.
//!
//! Every shared collection in the storefront (catalog, orders, wishlist,
//! profile) is shown to the user from an in-process cache that is fed from
//! three places at once:
//!
//! - local user actions, applied immediately and optimistically
//! - an authoritative snapshot stream from the remote document store
//! - a fallback blob persisted on the device for cold starts
//!
//! This crate contains the pure logic that reconciles them. It performs no IO
//! and never reads the wall clock: timestamps are passed in by the caller.
//!
//! ## Core Concepts
//!
//! ### Entities
//!
//! An [`Entity`] is an id plus a JSON field map and an `updatedAt` timestamp.
//! Two entities are compared field-wise while ignoring volatile fields
//! (see [`VolatileFields`]), so clock drift never keeps a write unconfirmed.
//!
//! ### Ledger
//!
//! The [`Ledger`] remembers every value authored locally that the remote has
//! not yet echoed back, plus the ids whose deletion is still unconfirmed.
//!
//! ### Reconciliation
//!
//! [`Reconciler::reconcile`] merges a remote [`Snapshot`] with the ledger:
//!
//! - a pending value equal to the remote record is confirmed and dropped
//! - a pending value that differs wins until the remote catches up
//! - pending creations not yet visible remotely are shown first
//! - ids pending deletion stay hidden until the remote drops them
//!
//! The merge is idempotent: replaying the same snapshot never toggles entries.
//!
//! ## Quick Start
//!
//! ```rust
//! use shopfront_engine::{CollectionState, Entity, Snapshot};
//! use serde_json::json;
//!
//! let mut state = CollectionState::new("products");
//!
//! // Optimistic create: visible before the remote knows about it.
//! let fields = json!({"name": "Tee", "price": 20}).as_object().cloned().unwrap();
//! state.create("p1", fields.clone(), 1000).unwrap();
//! assert!(state.get("p1").is_some());
//! assert_eq!(state.ledger().len(), 1);
//!
//! // The remote echoes the write back: the pending entry is confirmed.
//! let snapshot = Snapshot::new(vec![Entity::new("p1", fields, 1200)]);
//! let report = state.apply_snapshot(snapshot);
//! assert_eq!(report.confirmed, vec!["p1".to_string()]);
//! assert!(state.ledger().is_empty());
//! ```
//!
//! ## Persistence
//!
//! Use [`CacheBlob`] to serialize the visible state of a collection for the
//! local fallback store. Blobs carry a format version and are rejected when
//! written by a newer format.

pub mod entity;
pub mod error;
pub mod ledger;
pub mod reconcile;
pub mod schema;
pub mod snapshot;
pub mod state;

// Re-export main types at crate root
pub use entity::{Entity, VolatileFields};
pub use error::Error;
pub use ledger::{Ledger, PendingDelete, PendingWrite};
pub use reconcile::{merge, MergeOutcome, MergeReport, Reconciler};
pub use schema::{CollectionSchema, FieldDef, FieldType};
pub use snapshot::{CacheBlob, Snapshot, CACHE_FORMAT_VERSION};
pub use state::{CollectionState, StateSource};

/// Type aliases for clarity
pub type EntityId = String;
pub type CollectionName = String;
pub type Timestamp = u64;
pub type Sequence = u64;

/// Field map of an entity.
pub type Fields = serde_json::Map<String, serde_json::Value>;
