//! Remote authoritative document store.
//!
//! The remote delivers the full current snapshot of a collection whenever it
//! changes and accepts merge-writes and deletes that complete asynchronously.
//! The wire protocol behind it is left to the implementor.

mod memory;

pub use memory::MemoryRemote;

use crate::error::RemoteError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use shopfront_engine::{Fields, Snapshot};

/// Stream of full collection snapshots. Dropping it unsubscribes.
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, RemoteError>>;

/// Authoritative store every collection synchronizes against.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Open a real-time subscription to `collection`.
    async fn subscribe(&self, collection: &str) -> Result<SnapshotStream, RemoteError>;

    /// Merge `fields` into the document `id`, creating it if needed.
    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), RemoteError>;

    /// Delete the document `id`. Deleting a missing document succeeds.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), RemoteError>;

    /// One-shot read of the current snapshot.
    async fn fetch(&self, collection: &str) -> Result<Snapshot, RemoteError> {
        let mut stream = self.subscribe(collection).await?;
        match stream.next().await {
            Some(snapshot) => snapshot,
            None => Err(RemoteError::Unavailable(format!(
                "{} closed before the first snapshot",
                collection
            ))),
        }
    }
}
