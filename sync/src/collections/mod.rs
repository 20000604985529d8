//! Typed collections of the storefront.
//!
//! Each wraps a [`Collection`](crate::Collection) and converts between
//! entities and domain records with serde. Records that fail to decode are
//! skipped, never surfaced as errors.

pub mod catalog;
pub mod orders;
pub mod profile;
pub mod wishlist;

pub use catalog::{Catalog, Product};
pub use orders::{Order, OrderItem, OrderStatus, Orders};
pub use profile::{Profile, ProfileStore, Role};
pub use wishlist::Wishlist;

use crate::error::{Result, SyncError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shopfront_engine::{Entity, Fields};

/// Decode an entity into a record, with the entity id under `id`.
pub(crate) fn decode<T: DeserializeOwned>(entity: &Entity) -> Option<T> {
    let mut fields = entity.fields.clone();
    fields.insert("id".into(), Value::String(entity.id.clone()));
    match serde_json::from_value(Value::Object(fields)) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::debug!(id = %entity.id, error = %err, "skipping undecodable entity");
            None
        }
    }
}

/// Encode a record into entity fields.
pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Fields> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(fields),
        other => Err(SyncError::Invalid(format!("expected an object, got {}", other))),
    }
}
