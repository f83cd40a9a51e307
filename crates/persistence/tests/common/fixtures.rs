//! Record fixtures and wiring helpers.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use storefront_persistence::model::{Invoice, NewInvoice, NewProduct, Product};
use storefront_persistence::search::ReindexConfig;
use storefront_persistence::sync::{RetryConfig, SyncConfig};
use storefront_persistence::{CatalogService, InvoiceService};

use super::memory::{MemoryIndex, MemoryStore};

/// Parses a `YYYY-MM-DDTHH:mm:ss` UTC timestamp.
pub fn ts(value: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .expect("valid fixture timestamp")
        .and_utc()
}

/// Parses a decimal literal.
pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid fixture decimal")
}

/// A product with the given name and price; other fields have sensible defaults.
pub fn new_product(name: &str, price: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: format!("{} description", name),
        price: dec(price),
        discount_percentage: 0,
        stock: 10,
        image_url: format!("https://img.example.com/{}.png", name.to_lowercase().replace(' ', "-")),
        category_id: 1,
    }
}

/// An invoice for `user_id` with the given total.
pub fn new_invoice(user_id: i64, total: &str, status: &str) -> NewInvoice {
    NewInvoice {
        user_id,
        total_amount: dec(total),
        status: status.to_string(),
    }
}

/// Sync settings with no backoff delay, so relay tests run fast.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        backoff_multiplier: 2.0,
    }
}

/// Synchronous dual writes.
pub fn sync_config() -> SyncConfig {
    SyncConfig::synchronous().with_retry(fast_retry())
}

/// Outbox dual writes, optionally applying inline.
pub fn outbox_config(inline_apply: bool) -> SyncConfig {
    SyncConfig::outbox(inline_apply).with_retry(fast_retry())
}

/// A catalog service over fresh in-memory stores.
pub struct CatalogHarness {
    pub store: Arc<MemoryStore<Product>>,
    pub index: Arc<MemoryIndex>,
    pub service: CatalogService,
}

impl CatalogHarness {
    pub fn new(config: SyncConfig) -> Self {
        Self::with_reindex(config, ReindexConfig::default())
    }

    pub fn with_reindex(config: SyncConfig, reindex: ReindexConfig) -> Self {
        let store = Arc::new(MemoryStore::<Product>::new());
        let index = Arc::new(MemoryIndex::new());
        let service = CatalogService::new(store.clone(), index.clone(), config, reindex);
        Self {
            store,
            index,
            service,
        }
    }
}

/// An invoice service over fresh in-memory stores.
pub struct InvoiceHarness {
    pub store: Arc<MemoryStore<Invoice>>,
    pub index: Arc<MemoryIndex>,
    pub service: InvoiceService,
}

impl InvoiceHarness {
    pub fn new(config: SyncConfig) -> Self {
        let store = Arc::new(MemoryStore::<Invoice>::new());
        let index = Arc::new(MemoryIndex::new());
        let service =
            InvoiceService::new(store.clone(), index.clone(), config, ReindexConfig::default());
        Self {
            store,
            index,
            service,
        }
    }
}
