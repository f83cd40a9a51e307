//! Bulk reindexing of relational records into the search index.
//!
//! Two entry points are provided:
//!
//! - [`BulkReindexer::sync_all`] creates the entity's index and streams every
//!   row into it. Creation is a single atomic call; if the index (or an alias
//!   of the same name) already exists the run is refused and nothing is
//!   written.
//! - [`BulkReindexer::rebuild_via_alias`] builds a fresh, uniquely named
//!   physical index, populates it, then repoints the alias in one call and
//!   drops the indices it previously targeted.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::{BulkItem, CreateIndexOutcome, RelationalStore, SearchIndex};
use crate::error::{StorageError, StorageResult, SyncError};
use crate::model::SearchEntity;

/// Reindex tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexConfig {
    /// Number of `index` actions buffered per bulk request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    500
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

impl ReindexConfig {
    /// Sets the batch size. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// A document that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Document id (the record's primary key).
    pub document_id: String,
    /// Serialization error or the engine's rejection reason.
    pub reason: String,
}

/// Outcome of a reindex run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexReport {
    /// Physical index the documents were written to.
    pub index: String,
    /// Rows read from the relational store.
    pub total: u64,
    /// Documents the engine accepted.
    pub succeeded: u64,
    /// Documents that were not indexed.
    pub failed: u64,
    /// Per-document failure detail.
    pub failures: Vec<ItemFailure>,
}

impl ReindexReport {
    fn new(index: &str) -> Self {
        Self {
            index: index.to_string(),
            ..Self::default()
        }
    }

    fn record_failure(&mut self, document_id: String, reason: String) {
        self.failed += 1;
        self.failures.push(ItemFailure {
            document_id,
            reason,
        });
    }

    /// Returns true if every row was indexed.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.succeeded == self.total
    }
}

/// Streams every relational row of `E` into the search index.
pub struct BulkReindexer<E: SearchEntity> {
    store: Arc<dyn RelationalStore<E>>,
    index: Arc<dyn SearchIndex>,
    config: ReindexConfig,
}

impl<E: SearchEntity> BulkReindexer<E> {
    /// Creates a reindexer.
    pub fn new(
        store: Arc<dyn RelationalStore<E>>,
        index: Arc<dyn SearchIndex>,
        config: ReindexConfig,
    ) -> Self {
        Self {
            store,
            index,
            config,
        }
    }

    /// Creates the entity's index and populates it from scratch.
    ///
    /// Fails with [`SyncError::IndexAlreadyExists`] without touching the
    /// index if it is already present, including when a concurrent run won
    /// the creation race.
    pub async fn sync_all(&self) -> StorageResult<ReindexReport> {
        let index_name = E::ENTITY;
        self.create_index(index_name).await?;
        self.populate(index_name).await
    }

    /// Rebuilds the index behind `alias` without a window where searches
    /// see a partial index.
    pub async fn rebuild_via_alias(&self, alias: &str) -> StorageResult<ReindexReport> {
        let fresh = physical_index_name(alias);
        self.create_index(&fresh).await?;

        let swapped = async {
            let report = self.populate(&fresh).await?;
            let previous = self.index.alias_targets(alias).await?;
            self.index.swap_alias(alias, &previous, &fresh).await?;
            Ok::<_, StorageError>((report, previous))
        }
        .await;

        let (report, previous) = match swapped {
            Ok(swapped) => swapped,
            Err(e) => {
                warn!(index = %fresh, error = %e, "Rebuild aborted, dropping unused index");
                if let Err(cleanup) = self.index.delete_index(&fresh).await {
                    warn!(index = %fresh, error = %cleanup, "Failed to drop unused index");
                }
                return Err(e);
            }
        };

        info!(alias = %alias, index = %fresh, previous = ?previous, "Alias repointed");

        for old in previous.iter().filter(|old| old.as_str() != fresh) {
            if let Err(e) = self.index.delete_index(old).await {
                warn!(index = %old, error = %e, "Failed to drop previous index");
            }
        }

        Ok(report)
    }

    async fn create_index(&self, index_name: &str) -> StorageResult<()> {
        match self.index.create_index(index_name, E::index_mapping()).await? {
            CreateIndexOutcome::Created => {
                info!(entity = E::ENTITY, index = %index_name, "Created search index");
                Ok(())
            }
            CreateIndexOutcome::AlreadyExists => {
                info!(entity = E::ENTITY, index = %index_name, "Search index already exists, skipping reindex");
                Err(SyncError::IndexAlreadyExists {
                    index: index_name.to_string(),
                }
                .into())
            }
        }
    }

    async fn populate(&self, index_name: &str) -> StorageResult<ReindexReport> {
        let batch_size = self.config.batch_size.max(1);
        let mut report = ReindexReport::new(index_name);
        let mut batch = Vec::with_capacity(batch_size);
        let mut rows = self.store.stream_all();

        while let Some(row) = rows.next().await {
            let record = row?;
            report.total += 1;

            match record.to_document() {
                Ok(document) => batch.push(BulkItem {
                    document_id: record.document_id(),
                    document,
                }),
                Err(e) => {
                    warn!(entity = E::ENTITY, document_id = %record.document_id(), error = %e, "Failed to serialize record");
                    report.record_failure(record.document_id(), e.to_string());
                }
            }

            if batch.len() >= batch_size {
                self.flush(index_name, &mut batch, &mut report).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(index_name, &mut batch, &mut report).await?;
        }

        info!(
            entity = E::ENTITY,
            index = %index_name,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "Reindex finished"
        );
        Ok(report)
    }

    async fn flush(
        &self,
        index_name: &str,
        batch: &mut Vec<BulkItem>,
        report: &mut ReindexReport,
    ) -> StorageResult<()> {
        let items = std::mem::take(batch);
        debug!(index = %index_name, count = items.len(), "Flushing bulk batch");

        let response = self.index.bulk(index_name, items).await?;
        for item in response.items {
            if item.is_success() {
                report.succeeded += 1;
            } else {
                let reason = item
                    .error
                    .unwrap_or_else(|| format!("status {}", item.status));
                warn!(entity = E::ENTITY, document_id = %item.document_id, reason = %reason, "Bulk item rejected");
                report.record_failure(item.document_id, reason);
            }
        }
        Ok(())
    }
}

/// `{alias}_{yyyymmddHHMMSS}_{8 hex chars}`.
fn physical_index_name(alias: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        alias,
        Utc::now().format("%Y%m%d%H%M%S"),
        &suffix[..8]
    )
}
