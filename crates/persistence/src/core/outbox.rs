//! Durable outbox of pending index mutations.
//!
//! An outbox entry is written in the same relational transaction as the
//! entity mutation it describes, so a committed row always has a recorded
//! intent to update the index. A relay drains the outbox independently.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageResult;
use crate::model::SearchEntity;

use super::RelationalStore;

/// The index mutation recorded by an outbox entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum IndexMutation {
    /// Replace the document with this body.
    Upsert {
        /// Full search document.
        document: Value,
    },
    /// Remove the document.
    Delete,
}

impl IndexMutation {
    /// Returns the mutation name as stored in the outbox table.
    pub fn op(&self) -> &'static str {
        match self {
            IndexMutation::Upsert { .. } => "upsert",
            IndexMutation::Delete => "delete",
        }
    }

    /// Rebuilds a mutation from its stored columns.
    pub fn from_parts(op: &str, payload: Option<Value>) -> Option<Self> {
        match (op, payload) {
            ("upsert", Some(document)) => Some(IndexMutation::Upsert { document }),
            ("delete", _) => Some(IndexMutation::Delete),
            _ => None,
        }
    }

    /// Returns the document body for upserts.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            IndexMutation::Upsert { document } => Some(document),
            IndexMutation::Delete => None,
        }
    }
}

/// A pending outbox entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Monotonic entry id; defines apply order.
    pub id: i64,
    /// Entity name, e.g. `products`.
    pub entity: String,
    /// Search document id (the entity's primary key).
    pub document_id: String,
    /// The mutation to apply.
    pub mutation: IndexMutation,
    /// Number of failed apply attempts so far.
    pub attempts: u32,
    /// Most recent apply error.
    pub last_error: Option<String>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

/// Relational store that records index mutations transactionally.
#[async_trait]
pub trait OutboxStore<E: SearchEntity>: RelationalStore<E> {
    /// Inserts a row and its upsert entry in one transaction.
    async fn create_with_outbox(&self, new: E::New) -> StorageResult<E>;

    /// Updates a row and records its upsert entry in one transaction.
    async fn update_with_outbox(&self, id: i64, patch: E::Patch) -> StorageResult<E>;

    /// Deletes a row and records its delete entry in one transaction.
    async fn delete_with_outbox(&self, id: i64) -> StorageResult<()>;

    /// Returns up to `limit` entries for this entity that are neither applied
    /// nor dead-lettered, oldest first.
    async fn pending_outbox(&self, limit: usize) -> StorageResult<Vec<OutboxEntry>>;

    /// Marks an entry as applied.
    async fn mark_processed(&self, entry_id: i64) -> StorageResult<()>;

    /// Records a failed apply attempt.
    async fn mark_failed(&self, entry_id: i64, error: &str) -> StorageResult<()>;

    /// Records a final failed attempt and takes the entry out of the pending
    /// set. The entry is kept, with its error, for inspection.
    async fn mark_dead(&self, entry_id: i64, error: &str) -> StorageResult<()>;

    /// Deletes this entity's applied entries processed more than
    /// `older_than` ago. Returns the number removed.
    async fn purge_processed(&self, older_than: Duration) -> StorageResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mutation_parts_round_trip() {
        let upsert = IndexMutation::Upsert {
            document: json!({"id": 1}),
        };
        let rebuilt = IndexMutation::from_parts(upsert.op(), upsert.payload().cloned());
        assert_eq!(rebuilt, Some(upsert));

        assert_eq!(
            IndexMutation::from_parts("delete", None),
            Some(IndexMutation::Delete)
        );
        assert_eq!(IndexMutation::from_parts("upsert", None), None);
        assert_eq!(IndexMutation::from_parts("merge", None), None);
    }
}
