//! RelationalStore and OutboxStore implementations for PostgreSQL.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::core::{IndexMutation, OutboxEntry, OutboxStore, RelationalStore};
use crate::error::{BackendError, ResourceError, StorageError, StorageResult};
use crate::model::{Invoice, Product, SearchEntity};

use super::PostgresBackend;
use super::backend::pg_error;

/// Table mapping for an entity stored in PostgreSQL.
///
/// `COLUMNS` lists the business columns in parameter order; `id`,
/// `created_at` and `updated_at` are managed by the database.
pub trait PgEntity: SearchEntity {
    /// Table name.
    const TABLE: &'static str;

    /// Business columns, in the order of the insert and update parameters.
    const COLUMNS: &'static [&'static str];

    /// Decodes a row selected with [`select_list`].
    fn from_row(row: &Row) -> StorageResult<Self>;

    /// Parameters for `INSERT`, one per column.
    fn insert_params(new: &Self::New) -> Vec<&(dyn ToSql + Sync)>;

    /// Parameters for `UPDATE`, one per column.
    fn update_params(&self) -> Vec<&(dyn ToSql + Sync)>;
}

impl PgEntity for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "description",
        "price",
        "discount_percentage",
        "stock",
        "image_url",
        "category_id",
    ];

    fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            discount_percentage: row.try_get("discount_percentage")?,
            stock: row.try_get("stock")?,
            image_url: row.try_get("image_url")?,
            category_id: row.try_get("category_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn insert_params(new: &Self::New) -> Vec<&(dyn ToSql + Sync)> {
        vec![
            &new.name,
            &new.description,
            &new.price,
            &new.discount_percentage,
            &new.stock,
            &new.image_url,
            &new.category_id,
        ]
    }

    fn update_params(&self) -> Vec<&(dyn ToSql + Sync)> {
        vec![
            &self.name,
            &self.description,
            &self.price,
            &self.discount_percentage,
            &self.stock,
            &self.image_url,
            &self.category_id,
        ]
    }
}

impl PgEntity for Invoice {
    const TABLE: &'static str = "invoices";
    const COLUMNS: &'static [&'static str] = &["user_id", "total_amount", "status"];

    fn from_row(row: &Row) -> StorageResult<Self> {
        Ok(Invoice {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            total_amount: row.try_get("total_amount")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn insert_params(new: &Self::New) -> Vec<&(dyn ToSql + Sync)> {
        vec![&new.user_id, &new.total_amount, &new.status]
    }

    fn update_params(&self) -> Vec<&(dyn ToSql + Sync)> {
        vec![&self.user_id, &self.total_amount, &self.status]
    }
}

/// `id, <columns>, created_at, updated_at`.
pub fn select_list<E: PgEntity>() -> String {
    format!("id, {}, created_at, updated_at", E::COLUMNS.join(", "))
}

fn not_found<E: SearchEntity>(id: i64) -> StorageError {
    StorageError::Resource(ResourceError::NotFound {
        entity: E::ENTITY.to_string(),
        id,
    })
}

async fn insert_row<E: PgEntity>(
    tx: &deadpool_postgres::Transaction<'_>,
    new: &E::New,
) -> StorageResult<E> {
    let placeholders = (1..=E::COLUMNS.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        E::TABLE,
        E::COLUMNS.join(", "),
        placeholders,
        select_list::<E>()
    );

    let row = tx
        .query_one(&sql, &E::insert_params(new))
        .await
        .map_err(|e| pg_error(format!("Failed to insert into {}: {}", E::TABLE, e)))?;
    E::from_row(&row)
}

async fn update_row<E: PgEntity>(
    tx: &deadpool_postgres::Transaction<'_>,
    id: i64,
    patch: E::Patch,
) -> StorageResult<E> {
    let select = format!(
        "SELECT {} FROM {} WHERE id = $1 FOR UPDATE",
        select_list::<E>(),
        E::TABLE
    );
    let row = tx
        .query_opt(&select, &[&id])
        .await
        .map_err(|e| pg_error(format!("Failed to lock {} {}: {}", E::TABLE, id, e)))?
        .ok_or_else(|| not_found::<E>(id))?;

    let mut record = E::from_row(&row)?;
    record.apply_patch(patch, Utc::now());

    let assignments = E::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ${}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {}, updated_at = NOW() WHERE id = ${} RETURNING {}",
        E::TABLE,
        assignments,
        E::COLUMNS.len() + 1,
        select_list::<E>()
    );

    let mut params = record.update_params();
    params.push(&id);
    let row = tx
        .query_one(&sql, &params)
        .await
        .map_err(|e| pg_error(format!("Failed to update {} {}: {}", E::TABLE, id, e)))?;
    E::from_row(&row)
}

async fn delete_row<E: PgEntity>(
    tx: &deadpool_postgres::Transaction<'_>,
    id: i64,
) -> StorageResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
    let deleted = tx
        .execute(&sql, &[&id])
        .await
        .map_err(|e| pg_error(format!("Failed to delete {} {}: {}", E::TABLE, id, e)))?;

    if deleted == 0 {
        return Err(not_found::<E>(id));
    }
    Ok(())
}

async fn enqueue<E: SearchEntity>(
    tx: &deadpool_postgres::Transaction<'_>,
    document_id: &str,
    mutation: &IndexMutation,
) -> StorageResult<()> {
    let op = mutation.op();
    let payload: Option<&Value> = mutation.payload();
    tx.execute(
        "INSERT INTO search_outbox (entity, document_id, op, payload) VALUES ($1, $2, $3, $4)",
        &[&E::ENTITY, &document_id, &op, &payload],
    )
    .await
    .map_err(|e| pg_error(format!("Failed to enqueue outbox entry: {}", e)))?;
    Ok(())
}

fn upsert_of<E: SearchEntity>(record: &E) -> StorageResult<IndexMutation> {
    Ok(IndexMutation::Upsert {
        document: record.to_document()?,
    })
}

impl PostgresBackend {
    async fn begin(
        client: &mut deadpool_postgres::Client,
    ) -> StorageResult<deadpool_postgres::Transaction<'_>> {
        client
            .transaction()
            .await
            .map_err(|e| pg_error(format!("Failed to begin transaction: {}", e)))
    }

    async fn create_entity<E: PgEntity>(&self, new: E::New, outbox: bool) -> StorageResult<E> {
        let mut client = self.get_client().await?;
        let tx = Self::begin(&mut client).await?;

        let record = insert_row::<E>(&tx, &new).await?;
        if outbox {
            enqueue::<E>(&tx, &record.document_id(), &upsert_of(&record)?).await?;
        }

        tx.commit()
            .await
            .map_err(|e| pg_error(format!("Commit failed: {}", e)))?;
        Ok(record)
    }

    async fn update_entity<E: PgEntity>(
        &self,
        id: i64,
        patch: E::Patch,
        outbox: bool,
    ) -> StorageResult<E> {
        let mut client = self.get_client().await?;
        let tx = Self::begin(&mut client).await?;

        let record = update_row::<E>(&tx, id, patch).await?;
        if outbox {
            enqueue::<E>(&tx, &record.document_id(), &upsert_of(&record)?).await?;
        }

        tx.commit()
            .await
            .map_err(|e| pg_error(format!("Commit failed: {}", e)))?;
        Ok(record)
    }

    async fn delete_entity<E: PgEntity>(&self, id: i64, outbox: bool) -> StorageResult<()> {
        let mut client = self.get_client().await?;
        let tx = Self::begin(&mut client).await?;

        delete_row::<E>(&tx, id).await?;
        if outbox {
            enqueue::<E>(&tx, &id.to_string(), &IndexMutation::Delete).await?;
        }

        tx.commit()
            .await
            .map_err(|e| pg_error(format!("Commit failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl<E: PgEntity> RelationalStore<E> for PostgresBackend {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, new: E::New) -> StorageResult<E> {
        self.create_entity::<E>(new, false).await
    }

    async fn read(&self, id: i64) -> StorageResult<Option<E>> {
        let client = self.get_client().await?;
        let sql = format!("SELECT {} FROM {} WHERE id = $1", select_list::<E>(), E::TABLE);
        let row = client
            .query_opt(&sql, &[&id])
            .await
            .map_err(|e| pg_error(format!("Failed to read {} {}: {}", E::TABLE, id, e)))?;

        row.as_ref().map(E::from_row).transpose()
    }

    async fn update(&self, id: i64, patch: E::Patch) -> StorageResult<E> {
        self.update_entity::<E>(id, patch, false).await
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        self.delete_entity::<E>(id, false).await
    }

    fn stream_all(&self) -> BoxStream<'static, StorageResult<E>> {
        let pool = self.pool.clone();
        let batch_size = i64::from(self.config().stream_batch_size.max(1));
        let sql = format!(
            "SELECT {} FROM {} WHERE id > $1 ORDER BY id LIMIT $2",
            select_list::<E>(),
            E::TABLE
        );

        stream::try_unfold(Some(0i64), move |cursor| {
            let pool = pool.clone();
            let sql = sql.clone();
            async move {
                let Some(after) = cursor else {
                    return Ok::<_, StorageError>(None);
                };

                let client = pool.get().await.map_err(|e| {
                    StorageError::Backend(BackendError::ConnectionFailed {
                        backend_name: "postgres".to_string(),
                        message: e.to_string(),
                    })
                })?;
                let rows = client
                    .query(&sql, &[&after, &batch_size])
                    .await
                    .map_err(|e| pg_error(format!("Failed to page {}: {}", E::TABLE, e)))?;
                if rows.is_empty() {
                    return Ok(None);
                }

                let records = rows
                    .iter()
                    .map(E::from_row)
                    .collect::<StorageResult<Vec<E>>>()?;
                let next = if (records.len() as i64) < batch_size {
                    None
                } else {
                    records.last().map(|r| r.id())
                };

                Ok(Some((stream::iter(records.into_iter().map(Ok)), next)))
            }
        })
        .try_flatten()
        .boxed()
    }

    async fn count(&self) -> StorageResult<u64> {
        let client = self.get_client().await?;
        let row = client
            .query_one(&format!("SELECT COUNT(*) FROM {}", E::TABLE), &[])
            .await
            .map_err(|e| pg_error(format!("Failed to count {}: {}", E::TABLE, e)))?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl<E: PgEntity> OutboxStore<E> for PostgresBackend {
    async fn create_with_outbox(&self, new: E::New) -> StorageResult<E> {
        self.create_entity::<E>(new, true).await
    }

    async fn update_with_outbox(&self, id: i64, patch: E::Patch) -> StorageResult<E> {
        self.update_entity::<E>(id, patch, true).await
    }

    async fn delete_with_outbox(&self, id: i64) -> StorageResult<()> {
        self.delete_entity::<E>(id, true).await
    }

    async fn pending_outbox(&self, limit: usize) -> StorageResult<Vec<OutboxEntry>> {
        let client = self.get_client().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = client
            .query(
                "SELECT id, entity, document_id, op, payload, attempts, last_error, created_at
                 FROM search_outbox
                 WHERE entity = $1 AND processed_at IS NULL AND dead_at IS NULL
                 ORDER BY id
                 LIMIT $2",
                &[&E::ENTITY, &limit],
            )
            .await
            .map_err(|e| pg_error(format!("Failed to read outbox: {}", e)))?;

        rows.iter().map(outbox_entry_from_row).collect()
    }

    async fn mark_processed(&self, entry_id: i64) -> StorageResult<()> {
        let client = self.get_client().await?;
        client
            .execute(
                "UPDATE search_outbox SET processed_at = NOW() WHERE id = $1",
                &[&entry_id],
            )
            .await
            .map_err(|e| pg_error(format!("Failed to mark outbox entry {}: {}", entry_id, e)))?;
        Ok(())
    }

    async fn mark_failed(&self, entry_id: i64, error: &str) -> StorageResult<()> {
        let client = self.get_client().await?;
        client
            .execute(
                "UPDATE search_outbox SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
                &[&entry_id, &error],
            )
            .await
            .map_err(|e| pg_error(format!("Failed to mark outbox entry {}: {}", entry_id, e)))?;
        Ok(())
    }

    async fn mark_dead(&self, entry_id: i64, error: &str) -> StorageResult<()> {
        let client = self.get_client().await?;
        client
            .execute(
                "UPDATE search_outbox
                 SET attempts = attempts + 1, last_error = $2, dead_at = NOW()
                 WHERE id = $1",
                &[&entry_id, &error],
            )
            .await
            .map_err(|e| pg_error(format!("Failed to dead-letter outbox entry {}: {}", entry_id, e)))?;
        Ok(())
    }

    async fn purge_processed(&self, older_than: Duration) -> StorageResult<u64> {
        let client = self.get_client().await?;
        let seconds = older_than.as_secs_f64();
        client
            .execute(
                "DELETE FROM search_outbox
                 WHERE entity = $1
                   AND processed_at IS NOT NULL
                   AND processed_at < NOW() - make_interval(secs => $2)",
                &[&E::ENTITY, &seconds],
            )
            .await
            .map_err(|e| pg_error(format!("Failed to purge outbox: {}", e)))
    }
}

fn outbox_entry_from_row(row: &Row) -> StorageResult<OutboxEntry> {
    let op: String = row.try_get("op")?;
    let payload: Option<Value> = row.try_get("payload")?;
    let mutation = IndexMutation::from_parts(&op, payload)
        .ok_or_else(|| pg_error(format!("Unknown outbox operation: {}", op)))?;
    let attempts: i32 = row.try_get("attempts")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(OutboxEntry {
        id: row.try_get("id")?,
        entity: row.try_get("entity")?,
        document_id: row.try_get("document_id")?,
        mutation,
        attempts: u32::try_from(attempts).unwrap_or(0),
        last_error: row.try_get("last_error")?,
        created_at,
    })
}
