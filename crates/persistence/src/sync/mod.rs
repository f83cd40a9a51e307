//! Keeping the search index in step with the relational store.
//!
//! - [`DualWriteCoordinator`] performs entity mutations against both stores,
//!   either directly ([`SyncMode::Synchronous`]) or through the outbox
//!   ([`SyncMode::Outbox`]).
//! - [`OutboxRelay`] drains pending outbox entries into the index with
//!   exponential backoff.

mod config;
mod coordinator;
mod relay;

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::core::{DeleteOutcome, IndexMutation, Refresh, SearchIndex};
use crate::error::{BackendError, StorageResult};

pub use config::{RetryConfig, SyncConfig, SyncMode};
pub use coordinator::DualWriteCoordinator;
pub use relay::{OutboxRelay, RelayReport};

/// Runs `fut` under a deadline, mapping expiry to [`BackendError::Timeout`].
pub(crate) async fn with_timeout<T, F>(operation: &str, limit: Duration, fut: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout {
            operation: operation.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }
        .into()),
    }
}

/// Applies one mutation to the index. Deleting an absent document succeeds.
pub(crate) async fn apply_mutation(
    index: &dyn SearchIndex,
    index_name: &str,
    document_id: &str,
    mutation: &IndexMutation,
    refresh: Refresh,
) -> StorageResult<()> {
    match mutation {
        IndexMutation::Upsert { document } => {
            index
                .index_document(index_name, document_id, document.clone(), refresh)
                .await
        }
        IndexMutation::Delete => {
            if index.delete_document(index_name, document_id, refresh).await?
                == DeleteOutcome::NotFound
            {
                debug!(index = %index_name, document_id = %document_id, "Document already absent from index");
            }
            Ok(())
        }
    }
}
