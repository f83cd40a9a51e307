//! Dual writes against the relational store and the search index.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::core::{IndexMutation, OutboxStore, SearchIndex};
use crate::error::{ResourceError, StorageResult, SyncError};
use crate::model::SearchEntity;

use super::config::{SyncConfig, SyncMode};
use super::{apply_mutation, with_timeout};

/// Writes entity mutations to the database and mirrors them into the index.
///
/// The relational store is always written first and is the source of truth.
/// In synchronous mode an index failure after the commit is reported as
/// [`SyncError::IndexWriteFailed`]; the row stays committed. In outbox mode
/// the mutation and its outbox entry commit together and the index write is
/// left to [`OutboxRelay`](super::OutboxRelay), optionally attempted inline
/// first.
pub struct DualWriteCoordinator<E: SearchEntity> {
    store: Arc<dyn OutboxStore<E>>,
    index: Arc<dyn SearchIndex>,
    config: SyncConfig,
    index_name: String,
}

impl<E: SearchEntity> DualWriteCoordinator<E> {
    /// Creates a coordinator writing to the entity's default index.
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

    /// Returns the sync configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Inserts a record and indexes it under its new primary key.
    pub async fn create(&self, new: E::New) -> StorageResult<E> {
        let operation = format!("{}.create", E::ENTITY);
        let record = match self.config.mode {
            SyncMode::Synchronous => {
                with_timeout(&operation, self.config.operation_timeout, self.store.create(new))
                    .await?
            }
            SyncMode::Outbox => {
                with_timeout(
                    &operation,
                    self.config.operation_timeout,
                    self.store.create_with_outbox(new),
                )
                .await?
            }
        };
        debug!(entity = E::ENTITY, id = record.id(), "Record created");

        self.index_record(&record).await?;
        Ok(record)
    }

    /// Updates a record and re-indexes it.
    pub async fn update(&self, id: i64, patch: E::Patch) -> StorageResult<E> {
        let operation = format!("{}.update", E::ENTITY);
        let record = match self.config.mode {
            SyncMode::Synchronous => {
                with_timeout(
                    &operation,
                    self.config.operation_timeout,
                    self.store.update(id, patch),
                )
                .await?
            }
            SyncMode::Outbox => {
                with_timeout(
                    &operation,
                    self.config.operation_timeout,
                    self.store.update_with_outbox(id, patch),
                )
                .await?
            }
        };
        debug!(entity = E::ENTITY, id = id, "Record updated");

        self.index_record(&record).await?;
        Ok(record)
    }

    /// Deletes a record and its document.
    ///
    /// A missing record fails with [`ResourceError::NotFound`] before either
    /// store is written.
    pub async fn delete(&self, id: i64) -> StorageResult<()> {
        let operation = format!("{}.delete", E::ENTITY);
        let existing = with_timeout(&operation, self.config.operation_timeout, self.store.read(id))
            .await?;
        let Some(record) = existing else {
            return Err(ResourceError::NotFound {
                entity: E::ENTITY.to_string(),
                id,
            }
            .into());
        };

        match self.config.mode {
            SyncMode::Synchronous => {
                with_timeout(&operation, self.config.operation_timeout, self.store.delete(id))
                    .await?
            }
            SyncMode::Outbox => {
                with_timeout(
                    &operation,
                    self.config.operation_timeout,
                    self.store.delete_with_outbox(id),
                )
                .await?
            }
        }
        debug!(entity = E::ENTITY, id = id, "Record deleted");

        self.propagate(id, &record.document_id(), IndexMutation::Delete)
            .await
    }

    async fn index_record(&self, record: &E) -> StorageResult<()> {
        let document = record.to_document()?;
        self.propagate(
            record.id(),
            &record.document_id(),
            IndexMutation::Upsert { document },
        )
        .await
    }

    async fn propagate(
        &self,
        id: i64,
        document_id: &str,
        mutation: IndexMutation,
    ) -> StorageResult<()> {
        if self.config.mode == SyncMode::Outbox && !self.config.inline_apply {
            return Ok(());
        }

        let operation = format!("{}.index", E::ENTITY);
        let result = with_timeout(
            &operation,
            self.config.operation_timeout,
            apply_mutation(
                self.index.as_ref(),
                &self.index_name,
                document_id,
                &mutation,
                self.config.refresh,
            ),
        )
        .await;

        match (result, self.config.mode) {
            (Ok(()), _) => Ok(()),
            (Err(e), SyncMode::Outbox) => {
                warn!(
                    entity = E::ENTITY,
                    document_id = %document_id,
                    op = mutation.op(),
                    error = %e,
                    "Inline index write failed, leaving it to the outbox relay"
                );
                Ok(())
            }
            (Err(e), SyncMode::Synchronous) => {
                error!(
                    entity = E::ENTITY,
                    document_id = %document_id,
                    op = mutation.op(),
                    error = %e,
                    "Index write failed after database commit; stores have diverged"
                );
                Err(SyncError::IndexWriteFailed {
                    entity: E::ENTITY.to_string(),
                    id,
                    message: e.to_string(),
                }
                .into())
            }
        }
    }
}
