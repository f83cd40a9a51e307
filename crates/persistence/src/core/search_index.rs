//! Search-engine transport.
//!
//! [`SearchIndex`] is the narrow set of index administration, document and
//! search calls the sync engine needs. Query bodies are passed as rendered
//! JSON; building them is the job of the query and aggregation builders.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageResult;

/// Refresh policy for document writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refresh {
    /// Refresh the affected shards immediately so the write is searchable.
    True,
    /// Leave visibility to the index refresh interval.
    #[default]
    False,
    /// Block until the next scheduled refresh makes the write visible.
    WaitFor,
}

impl Refresh {
    /// Returns the wire value of the `refresh` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Refresh::True => "true",
            Refresh::False => "false",
            Refresh::WaitFor => "wait_for",
        }
    }
}

/// Result of an atomic create-index call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateIndexOutcome {
    /// The index was created with the supplied body.
    Created,
    /// An index with that name already existed; nothing was changed.
    AlreadyExists,
}

/// Result of a document delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The document existed and was removed.
    Deleted,
    /// There was no document with that id.
    NotFound,
}

/// One `index` action in a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItem {
    /// Document id.
    pub document_id: String,
    /// Document body.
    pub document: Value,
}

/// Per-item outcome of a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemResult {
    /// Document id.
    pub document_id: String,
    /// HTTP-style status of the item.
    pub status: u16,
    /// Rejection reason when the item failed.
    pub error: Option<String>,
}

impl BulkItemResult {
    /// Returns true if the item was accepted.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

/// Outcome of a bulk request that reached the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    /// One result per submitted item, in submission order.
    pub items: Vec<BulkItemResult>,
}

impl BulkResponse {
    /// Returns true if any item failed.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|item| !item.is_success())
    }
}

/// Search index administration, document writes and search.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Returns true if the index (or alias) exists.
    async fn index_exists(&self, index: &str) -> StorageResult<bool>;

    /// Creates an index in a single call.
    ///
    /// An existing index is reported as [`CreateIndexOutcome::AlreadyExists`]
    /// rather than an error, so concurrent callers cannot both "win".
    async fn create_index(&self, index: &str, body: Value) -> StorageResult<CreateIndexOutcome>;

    /// Deletes an index. Deleting a missing index is not an error.
    async fn delete_index(&self, index: &str) -> StorageResult<()>;

    /// Makes all prior writes to the index searchable.
    async fn refresh(&self, index: &str) -> StorageResult<()>;

    /// Creates or replaces a document under the given id.
    async fn index_document(
        &self,
        index: &str,
        document_id: &str,
        document: Value,
        refresh: Refresh,
    ) -> StorageResult<()>;

    /// Deletes a document by id.
    async fn delete_document(
        &self,
        index: &str,
        document_id: &str,
        refresh: Refresh,
    ) -> StorageResult<DeleteOutcome>;

    /// Runs a search and returns the raw response body.
    async fn search(&self, index: &str, body: Value) -> StorageResult<Value>;

    /// Submits a batch of `index` actions.
    ///
    /// An `Err` means the request as a whole failed; item rejections are
    /// reported in the returned [`BulkResponse`].
    async fn bulk(&self, index: &str, items: Vec<BulkItem>) -> StorageResult<BulkResponse>;

    /// Returns the concrete indices an alias points to (empty if none).
    async fn alias_targets(&self, alias: &str) -> StorageResult<Vec<String>>;

    /// Atomically points `alias` at `add` and detaches it from `remove`.
    async fn swap_alias(&self, alias: &str, remove: &[String], add: &str) -> StorageResult<()>;
}
