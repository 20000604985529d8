//! Snapshot types for remote state and the local fallback cache.
//!
//! A [`Snapshot`] is the complete remote truth for one collection at a point
//! in time. A [`CacheBlob`] is what gets written to the device so the
//! collection can be shown before the first snapshot arrives.

use crate::{error::Result, CollectionName, Entity, EntityId, Error, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Version of the cache blob format for future compatibility.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// An ordered, id-unique sequence of entities.
///
/// If the source contains the same id more than once, the first occurrence
/// is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Entity>", into = "Vec<Entity>")]
pub struct Snapshot {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
}

impl Snapshot {
    /// Create a snapshot, dropping duplicate ids.
    pub fn new(entities: Vec<Entity>) -> Self {
        let mut kept = Vec::with_capacity(entities.len());
        let mut index = HashMap::with_capacity(entities.len());

        for entity in entities {
            if index.contains_key(&entity.id) {
                continue;
            }
            index.insert(entity.id.clone(), kept.len());
            kept.push(entity);
        }

        Self {
            entities: kept,
            index,
        }
    }

    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// All entities in snapshot order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Get an entity by id.
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    /// Check whether an id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the snapshot has no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Consume the snapshot, returning its entities.
    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }
}

impl From<Vec<Entity>> for Snapshot {
    fn from(entities: Vec<Entity>) -> Self {
        Self::new(entities)
    }
}

impl From<Snapshot> for Vec<Entity> {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.entities
    }
}

/// Serialized visible state of one collection, as stored on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheBlob {
    /// Blob format version
    pub format_version: u32,
    /// Collection the entities belong to
    pub collection: CollectionName,
    /// When the blob was written (milliseconds since epoch)
    pub saved_at: Timestamp,
    /// Visible entities in display order
    pub entities: Vec<Entity>,
}

impl CacheBlob {
    /// Create a blob from visible entities.
    pub fn new(
        collection: impl Into<CollectionName>,
        entities: Vec<Entity>,
        saved_at: Timestamp,
    ) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            collection: collection.into(),
            saved_at,
            entities,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidCacheBlob(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let blob: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidCacheBlob(e.to_string()))?;

        // Validate format version
        if blob.format_version > CACHE_FORMAT_VERSION {
            return Err(Error::InvalidCacheBlob(format!(
                "unsupported cache format version: {} (max supported: {})",
                blob.format_version, CACHE_FORMAT_VERSION
            )));
        }

        Ok(blob)
    }

    /// Check the blob belongs to `collection`.
    pub fn validate(&self, collection: &str) -> Result<()> {
        if self.collection != collection {
            return Err(Error::CollectionMismatch {
                expected: collection.to_string(),
                actual: self.collection.clone(),
            });
        }
        Ok(())
    }

    /// Convert into a snapshot usable as a cold-start base.
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot::new(self.entities)
    }
}
