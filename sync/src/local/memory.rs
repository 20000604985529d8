//! In-memory blob store.

use super::LocalStore;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Blob store that forgets everything on drop.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    blobs: DashMap<String, String>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn load_blob(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.get(key).map(|value| value.value().clone()))
    }

    async fn save_blob(&self, key: &str, value: &str) -> Result<()> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
