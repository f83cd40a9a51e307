//! Product catalog service.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{OutboxStore, RelationalStore, SearchIndex};
use crate::error::{ResourceError, StorageResult, ValidationError};
use crate::model::{NewProduct, Product, ProductPatch, SearchEntity};
use crate::search::{
    BulkReindexer, QueryBuilder, ReindexConfig, ReindexReport, SearchHits, parse_hits,
};
use crate::sync::{DualWriteCoordinator, OutboxRelay, SyncConfig};
use crate::types::{DateRange, NumericRange, Pagination, parse_sort_by};

use super::invalid;

/// Sort applied when the request does not specify one.
pub const DEFAULT_PRODUCT_SORT: &str = "id:desc";

/// Fields searched by the free-text `query` parameter.
pub const PRODUCT_TEXT_FIELDS: [&str; 3] = ["name", "description", "price.as_text"];

/// Product search request parameters, as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSearchParams {
    /// Hits to skip (default 0).
    pub offset: Option<u32>,
    /// Page size (default 5, at most 10).
    pub limit: Option<u32>,
    /// `field[:asc|desc],...`; defaults to [`DEFAULT_PRODUCT_SORT`].
    pub sort_by: Option<String>,
    /// Free text matched against [`PRODUCT_TEXT_FIELDS`].
    pub query: Option<String>,
    /// Full-text match on `name` only.
    pub name: Option<String>,
    /// Inclusive lower price bound, as a decimal string.
    pub price_gte: Option<String>,
    /// Inclusive upper price bound, as a decimal string.
    pub price_lte: Option<String>,
    /// Inclusive lower creation-time bound, `YYYY-MM-DDTHH:mm:ss`.
    pub created_at_gte: Option<String>,
    /// Inclusive upper creation-time bound, `YYYY-MM-DDTHH:mm:ss`.
    pub created_at_lte: Option<String>,
}

/// Products: writes go to PostgreSQL and Elasticsearch, searches to Elasticsearch.
pub struct CatalogService {
    store: Arc<dyn OutboxStore<Product>>,
    index: Arc<dyn SearchIndex>,
    coordinator: DualWriteCoordinator<Product>,
    sync_config: SyncConfig,
    reindex_config: ReindexConfig,
}

impl CatalogService {
    /// Creates the service and its write coordinator.
    pub fn new(
        store: Arc<dyn OutboxStore<Product>>,
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

    /// Fetches a product from the store of record.
    pub async fn get(&self, id: i64) -> StorageResult<Product> {
        self.store.read(id).await?.ok_or_else(|| {
            ResourceError::NotFound {
                entity: Product::ENTITY.to_string(),
                id,
            }
            .into()
        })
    }

    /// Validates and creates a record, then indexes it.
    pub async fn create(&self, new: NewProduct) -> StorageResult<Product> {
        validate_new(&new)?;
        self.coordinator.create(new).await
    }

    /// Validates and applies a partial update, then re-indexes the record.
    pub async fn update(&self, id: i64, patch: ProductPatch) -> StorageResult<Product> {
        validate_patch(&patch)?;
        self.coordinator.update(id, patch).await
    }

    /// Deletes a record and its search document.
    pub async fn delete(&self, id: i64) -> StorageResult<()> {
        self.coordinator.delete(id).await
    }

    /// Runs a filtered, sorted, paginated product search.
    ///
    /// Every parameter is validated before the index is contacted.
    pub async fn search_products(
        &self,
        params: &ProductSearchParams,
    ) -> StorageResult<SearchHits<Product>> {
        let pagination = Pagination::from_params(params.offset, params.limit)?;
        let price = NumericRange::parse(
            "price",
            params.price_gte.as_deref(),
            params.price_lte.as_deref(),
        )?;
        let created_at = DateRange::parse(
            "created_at",
            params.created_at_gte.as_deref(),
            params.created_at_lte.as_deref(),
        )?;
        let sort = parse_sort_by(params.sort_by.as_deref().unwrap_or(DEFAULT_PRODUCT_SORT));

        let request = QueryBuilder::for_entity::<Product>()
            .paginate(pagination)
            .sort_by(sort)
            .multi_match(&PRODUCT_TEXT_FIELDS, params.query.as_deref())
            .match_text("name", params.name.as_deref())
            .numeric_range("price", price)
            .date_range("created_at", created_at)
            .build()?;

        debug!(entity = Product::ENTITY, from = pagination.offset, size = pagination.limit, "Searching products");
        let body = self.index.search(Product::ENTITY, request.to_json()).await?;
        parse_hits(&body)
    }

    /// Creates the products index and loads every row into it.
    pub async fn sync_all(&self) -> StorageResult<ReindexReport> {
        self.reindexer().sync_all().await
    }

    /// Rebuilds the products index behind its alias.
    pub async fn rebuild(&self) -> StorageResult<ReindexReport> {
        self.reindexer().rebuild_via_alias(Product::ENTITY).await
    }

    /// Returns an outbox relay for products.
    pub fn relay(&self) -> OutboxRelay<Product> {
        OutboxRelay::new(
            Arc::clone(&self.store),
            Arc::clone(&self.index),
            self.sync_config.clone(),
        )
    }

    fn reindexer(&self) -> BulkReindexer<Product> {
        let store: Arc<dyn RelationalStore<Product>> = self.store.clone();
        BulkReindexer::new(store, Arc::clone(&self.index), self.reindex_config.clone())
    }
}

fn validate_price(price: Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        return Err(invalid("price", "must not be negative"));
    }
    Ok(())
}

fn validate_discount(discount: i32) -> Result<(), ValidationError> {
    if !(0..=100).contains(&discount) {
        return Err(invalid("discount_percentage", "must be between 0 and 100"));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), ValidationError> {
    if stock < 0 {
        return Err(invalid("stock", "must not be negative"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(invalid("name", "must not be blank"));
    }
    Ok(())
}

fn validate_new(new: &NewProduct) -> Result<(), ValidationError> {
    validate_name(&new.name)?;
    validate_price(new.price)?;
    validate_discount(new.discount_percentage)?;
    validate_stock(new.stock)
}

fn validate_patch(patch: &ProductPatch) -> Result<(), ValidationError> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(price) = patch.price {
        validate_price(price)?;
    }
    if let Some(discount) = patch.discount_percentage {
        validate_discount(discount)?;
    }
    if let Some(stock) = patch.stock {
        validate_stock(stock)?;
    }
    Ok(())
}
