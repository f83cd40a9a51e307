//! Invoice service: CRUD, search and `total_amount` aggregations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{OutboxStore, RelationalStore, SearchIndex};
use crate::error::{ResourceError, StorageResult, ValidationError};
use crate::model::{Invoice, InvoicePatch, InvoiceReport, NewInvoice, SearchEntity};
use crate::search::{
    AggregationBuilder, BulkReindexer, QueryBuilder, ReindexConfig, ReindexReport, SearchHits,
    metric_value, parse_hits,
};
use crate::sync::{DualWriteCoordinator, OutboxRelay, SyncConfig};
use crate::types::{DateRange, Pagination, parse_sort_by};

use super::invalid;

/// Sort applied when the request does not specify one.
pub const DEFAULT_INVOICE_SORT: &str = "id:asc";

/// Name of the `sum` aggregation over `total_amount`.
pub const TOTAL_AMOUNT_SUM: &str = "total_amount_sum";

/// Name of the `avg` aggregation over `total_amount`.
pub const TOTAL_AMOUNT_AVG: &str = "total_amount_avg";

/// Invoice search request parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceSearchParams {
    /// Hits to skip (default 0).
    pub offset: Option<u32>,
    /// Page size (default 5, at most 10).
    pub limit: Option<u32>,
    /// `field[:asc|desc],...`; defaults to [`DEFAULT_INVOICE_SORT`].
    pub sort_by: Option<String>,
    /// Inclusive lower creation-time bound, `YYYY-MM-DDTHH:mm:ss`.
    pub created_at_gte: Option<String>,
    /// Inclusive upper creation-time bound, `YYYY-MM-DDTHH:mm:ss`.
    pub created_at_lte: Option<String>,
}

/// Time window for invoice aggregations. Both bounds are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceAggregationParams {
    /// Inclusive lower creation-time bound, `YYYY-MM-DDTHH:mm:ss`.
    pub created_at_gte: Option<String>,
    /// Inclusive upper creation-time bound, `YYYY-MM-DDTHH:mm:ss`.
    pub created_at_lte: Option<String>,
}

impl InvoiceAggregationParams {
    fn window(&self) -> Result<DateRange, ValidationError> {
        DateRange::parse(
            "created_at",
            self.created_at_gte.as_deref(),
            self.created_at_lte.as_deref(),
        )
    }
}

/// Invoices: writes go to PostgreSQL and Elasticsearch, reads and reports to Elasticsearch.
pub struct InvoiceService {
    store: Arc<dyn OutboxStore<Invoice>>,
    index: Arc<dyn SearchIndex>,
    coordinator: DualWriteCoordinator<Invoice>,
    sync_config: SyncConfig,
    reindex_config: ReindexConfig,
}

impl InvoiceService {
    /// Creates the service and its write coordinator.
    pub fn new(
        store: Arc<dyn OutboxStore<Invoice>>,
        index: Arc<dyn SearchIndex>,
        sync_config: SyncConfig,
        reindex_config: ReindexConfig,
    ) -> Self {
        let coordinator =
            DualWriteCoordinator::new(Arc::clone(&store), Arc::clone(&index), sync_config.clone());
        Self {
            store,
            index,
            coordinator,
            sync_config,
            reindex_config,
        }
    }

    /// Fetches an invoice from the store of record.
    pub async fn get(&self, id: i64) -> StorageResult<Invoice> {
        self.store.read(id).await?.ok_or_else(|| {
            ResourceError::NotFound {
                entity: Invoice::ENTITY.to_string(),
                id,
            }
            .into()
        })
    }

    /// Validates and creates a record, then indexes it.
    pub async fn create(&self, new: NewInvoice) -> StorageResult<Invoice> {
        if new.total_amount.is_sign_negative() {
            return Err(invalid("total_amount", "must not be negative").into());
        }
        validate_status(&new.status)?;
        self.coordinator.create(new).await
    }

    /// Validates and applies a partial update, then re-indexes the record.
    pub async fn update(&self, id: i64, patch: InvoicePatch) -> StorageResult<Invoice> {
        if let Some(status) = &patch.status {
            validate_status(status)?;
        }
        self.coordinator.update(id, patch).await
    }

    /// Deletes a record and its search document.
    pub async fn delete(&self, id: i64) -> StorageResult<()> {
        self.coordinator.delete(id).await
    }

    /// Runs a sorted, paginated invoice search, optionally within a time window.
    pub async fn search_invoices(
        &self,
        params: &InvoiceSearchParams,
    ) -> StorageResult<SearchHits<Invoice>> {
        let pagination = Pagination::from_params(params.offset, params.limit)?;
        let created_at = DateRange::parse(
            "created_at",
            params.created_at_gte.as_deref(),
            params.created_at_lte.as_deref(),
        )?;
        let sort = parse_sort_by(params.sort_by.as_deref().unwrap_or(DEFAULT_INVOICE_SORT));

        let request = QueryBuilder::for_entity::<Invoice>()
            .paginate(pagination)
            .sort_by(sort)
            .date_range("created_at", created_at)
            .build()?;

        let body = self.index.search(Invoice::ENTITY, request.to_json()).await?;
        parse_hits(&body)
    }

    /// Sum of `total_amount` in the window; zero when nothing matches.
    pub async fn total_amount_sum(&self, params: &InvoiceAggregationParams) -> StorageResult<f64> {
        let request = AggregationBuilder::new()
            .date_range("created_at", params.window()?)
            .sum(TOTAL_AMOUNT_SUM, "total_amount")
            .build();

        let body = self.index.search(Invoice::ENTITY, request.to_json()).await?;
        Ok(metric_value(&body, TOTAL_AMOUNT_SUM).unwrap_or(0.0))
    }

    /// Sum and average of `total_amount` in the window.
    pub async fn report(&self, params: &InvoiceAggregationParams) -> StorageResult<InvoiceReport> {
        let window = params.window()?;
        let request = AggregationBuilder::new()
            .date_range("created_at", window)
            .sum(TOTAL_AMOUNT_SUM, "total_amount")
            .avg(TOTAL_AMOUNT_AVG, "total_amount")
            .build();

        let body = self.index.search(Invoice::ENTITY, request.to_json()).await?;
        let report = InvoiceReport {
            start_time: window.gte,
            end_time: window.lte,
            sum: metric_value(&body, TOTAL_AMOUNT_SUM).unwrap_or(0.0),
            avg: metric_value(&body, TOTAL_AMOUNT_AVG).unwrap_or(0.0),
        };
        debug!(sum = report.sum, avg = report.avg, "Invoice report computed");
        Ok(report)
    }

    /// Creates the invoices index and loads every row into it.
    pub async fn sync_all(&self) -> StorageResult<ReindexReport> {
        self.reindexer().sync_all().await
    }

    /// Rebuilds the invoices index behind its alias.
    pub async fn rebuild(&self) -> StorageResult<ReindexReport> {
        self.reindexer().rebuild_via_alias(Invoice::ENTITY).await
    }

    /// Returns an outbox relay for invoices.
    pub fn relay(&self) -> OutboxRelay<Invoice> {
        OutboxRelay::new(
            Arc::clone(&self.store),
            Arc::clone(&self.index),
            self.sync_config.clone(),
        )
    }

    fn reindexer(&self) -> BulkReindexer<Invoice> {
        let store: Arc<dyn RelationalStore<Invoice>> = self.store.clone();
        BulkReindexer::new(store, Arc::clone(&self.index), self.reindex_config.clone())
    }
}

fn validate_status(status: &str) -> Result<(), ValidationError> {
    if status.trim().is_empty() {
        return Err(invalid("status", "must not be blank"));
    }
    Ok(())
}
