//! Local persistent store used as the fallback cache.
//!
//! The store holds opaque string blobs under string keys, last write wins.
//! [`LocalCache`] binds one key to one collection and speaks [`CacheBlob`].

mod memory;
mod sqlite;

pub use memory::MemoryLocalStore;
pub use sqlite::SqliteLocalStore;

use crate::error::Result;
use async_trait::async_trait;
use shopfront_engine::{CacheBlob, Entity, Timestamp};
use std::fmt;
use std::sync::Arc;

/// Durable key-value blob storage.
#[async_trait]
pub trait LocalStore: Send + Sync + 'static {
    /// Load the blob stored under `key`.
    async fn load_blob(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the blob stored under `key`.
    async fn save_blob(&self, key: &str, value: &str) -> Result<()>;
}

/// Storage key of a collection's cache blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key shared by every user of the device.
    pub fn shared(collection: &str) -> Self {
        Self(format!("cache/{}", collection))
    }

    /// Key private to one authenticated identity.
    pub fn scoped(collection: &str, user_id: &str) -> Self {
        Self(format!("cache/{}/{}", user_id, collection))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache blob access for one collection.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn LocalStore>,
    key: CacheKey,
    collection: String,
}

impl LocalCache {
    pub fn new(store: Arc<dyn LocalStore>, key: CacheKey, collection: impl Into<String>) -> Self {
        Self {
            store,
            key,
            collection: collection.into(),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Load the cached visible entities, if any were saved for this collection.
    pub async fn load(&self) -> Result<Option<Vec<Entity>>> {
        let Some(json) = self.store.load_blob(self.key.as_str()).await? else {
            return Ok(None);
        };
        let blob = CacheBlob::from_json(&json)?;
        blob.validate(&self.collection)?;
        Ok(Some(blob.into_snapshot().into_entities()))
    }

    /// Overwrite the cache with `entities`.
    pub async fn save(&self, entities: Vec<Entity>, saved_at: Timestamp) -> Result<()> {
        let blob = CacheBlob::new(self.collection.clone(), entities, saved_at);
        self.store.save_blob(self.key.as_str(), &blob.to_json()?).await
    }
}

impl fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCache")
            .field("key", &self.key)
            .field("collection", &self.collection)
            .finish()
    }
}
