//! Draining the outbox into the search index.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::core::{OutboxEntry, OutboxStore, SearchIndex};
use crate::error::StorageResult;
use crate::model::SearchEntity;

use super::config::SyncConfig;
use super::{apply_mutation, with_timeout};

/// Outcome of one relay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayReport {
    /// Entries applied and marked processed.
    pub processed: usize,
    /// Entries that exhausted their retries this pass and stay pending.
    pub failed: usize,
    /// Entries held back because an earlier entry for the same document failed.
    pub deferred: usize,
    /// Entries that reached `max_attempts` this pass and were dead-lettered.
    pub dead: usize,
    /// Applied entries older than the retention window that were deleted.
    pub purged: u64,
}

/// Applies pending outbox entries of `E` to the index, in entry order.
///
/// Entries that fail stay pending and are retried on the next pass. Later
/// entries for the same document are held back until the earlier one
/// succeeds, so the index always converges on the last committed write.
///
/// An entry that fails `max_attempts` passes is dead-lettered: it leaves the
/// pending set with its last error recorded, and later entries for its
/// document proceed. A poisoned entry therefore cannot occupy a batch slot
/// forever.
pub struct OutboxRelay<E: SearchEntity> {
    store: Arc<dyn OutboxStore<E>>,
    index: Arc<dyn SearchIndex>,
    config: SyncConfig,
    index_name: String,
}

impl<E: SearchEntity> OutboxRelay<E> {
    /// Creates a relay writing to the entity's default index.
    pub fn new(
        store: Arc<dyn OutboxStore<E>>,
        index: Arc<dyn SearchIndex>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            index,
            config,
            index_name: E::ENTITY.to_string(),
        }
    }

    /// Overrides the index (or alias) documents are written to.
    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    /// Drains up to `relay_batch_size` pending entries.
    pub async fn run_once(&self) -> StorageResult<RelayReport> {
        let entries = self
            .store
            .pending_outbox(self.config.relay_batch_size)
            .await?;
        let mut report = RelayReport::default();
        let mut blocked: HashSet<String> = HashSet::new();

        for entry in entries {
            if blocked.contains(&entry.document_id) {
                report.deferred += 1;
                continue;
            }

            match self.apply_with_retry(&entry).await {
                Ok(()) => {
                    self.store.mark_processed(entry.id).await?;
                    report.processed += 1;
                }
                Err(e) => {
                    let attempts = entry.attempts + 1;
                    if attempts >= self.config.max_attempts.max(1) {
                        error!(
                            entity = E::ENTITY,
                            entry_id = entry.id,
                            document_id = %entry.document_id,
                            attempts = attempts,
                            error = %e,
                            "Outbox entry exceeded max attempts, dead-lettering"
                        );
                        self.store.mark_dead(entry.id, &e.to_string()).await?;
                        report.dead += 1;
                    } else {
                        warn!(
                            entity = E::ENTITY,
                            entry_id = entry.id,
                            document_id = %entry.document_id,
                            attempts = attempts,
                            error = %e,
                            "Outbox entry failed, will retry on next pass"
                        );
                        self.store.mark_failed(entry.id, &e.to_string()).await?;
                        blocked.insert(entry.document_id);
                        report.failed += 1;
                    }
                }
            }
        }

        report.purged = self
            .store
            .purge_processed(self.config.outbox_retention)
            .await?;

        if report.processed + report.failed + report.dead > 0 || report.purged > 0 {
            info!(
                entity = E::ENTITY,
                processed = report.processed,
                failed = report.failed,
                deferred = report.deferred,
                dead = report.dead,
                purged = report.purged,
                "Outbox relay pass finished"
            );
        }
        Ok(report)
    }

    /// Runs [`run_once`](Self::run_once) every `interval` until `shutdown`
    /// becomes true or its sender is dropped.
    pub fn spawn(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            warn!(entity = E::ENTITY, error = %e, "Outbox relay pass failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!(entity = E::ENTITY, "Outbox relay stopping");
                            break;
                        }
                    }
                }
            }
        })
    }

    async fn apply_with_retry(&self, entry: &OutboxEntry) -> StorageResult<()> {
        let retry = &self.config.retry;
        let operation = format!("{}.relay", E::ENTITY);
        let mut delay = retry.initial_delay;
        let mut attempts = 0;

        loop {
            attempts += 1;

            let result = with_timeout(
                &operation,
                self.config.operation_timeout,
                apply_mutation(
                    self.index.as_ref(),
                    &self.index_name,
                    &entry.document_id,
                    &entry.mutation,
                    self.config.refresh,
                ),
            )
            .await;

            match result {
                Ok(()) => {
                    if attempts > 1 {
                        debug!(entry_id = entry.id, attempts = attempts, "Outbox entry applied after retries");
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempts > retry.max_retries {
                        return Err(e);
                    }

                    warn!(
                        entry_id = entry.id,
                        attempt = attempts,
                        max_retries = retry.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Outbox apply failed, retrying"
                    );

                    sleep(delay).await;
                    delay = retry.next_delay(delay);
                }
            }
        }
    }
}
