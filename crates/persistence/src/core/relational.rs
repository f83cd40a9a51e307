//! Relational store of record.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StorageResult;
use crate::model::SearchEntity;

/// CRUD primitives for one entity type in the relational store.
///
/// The relational store is the sole source of truth; implementations assign
/// primary keys and timestamps.
#[async_trait]
pub trait RelationalStore<E: SearchEntity>: Send + Sync {
    /// Returns a human-readable name for this store.
    fn backend_name(&self) -> &'static str;

    /// Inserts a new row and returns it with its primary key and timestamps.
    async fn create(&self, new: E::New) -> StorageResult<E>;

    /// Reads a row by primary key.
    async fn read(&self, id: i64) -> StorageResult<Option<E>>;

    /// Applies a partial update and returns the updated row.
    ///
    /// Fails with `ResourceError::NotFound` if the row does not exist.
    async fn update(&self, id: i64, patch: E::Patch) -> StorageResult<E>;

    /// Deletes a row by primary key.
    ///
    /// Fails with `ResourceError::NotFound` if the row does not exist.
    async fn delete(&self, id: i64) -> StorageResult<()>;

    /// Streams every row in primary-key order.
    fn stream_all(&self) -> BoxStream<'static, StorageResult<E>>;

    /// Counts rows.
    async fn count(&self) -> StorageResult<u64>;

    /// Returns true if a row with the given key exists.
    async fn exists(&self, id: i64) -> StorageResult<bool> {
        Ok(self.read(id).await?.is_some())
    }
}
