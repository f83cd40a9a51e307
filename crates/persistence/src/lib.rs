//! Storefront Persistence Layer
//!
//! This crate keeps a relational store of record (PostgreSQL) and a search
//! index (Elasticsearch) in step, and builds dynamic, validated search and
//! aggregation requests against the index.
//!
//! # Features
//!
//! - **Dual writes**: every create, update and delete lands in the database
//!   first and is then mirrored into the index, either synchronously or
//!   through a durable outbox drained by a retrying relay
//! - **Bulk reindexing**: stream every row into a freshly created index, with
//!   a per-document report, or rebuild behind an alias with an atomic swap
//! - **Dynamic queries**: sort specs, whitelisted field names, optional
//!   numeric and date ranges, free-text and pagination rendered from a typed
//!   request AST
//! - **Aggregations**: sum and average over a time window
//!
//! # Backend Features
//!
//! ```toml
//! [dependencies]
//! storefront-persistence = { version = "0.1", features = ["postgres", "elasticsearch"] }
//! ```
//!
//! - `postgres` (default) - store of record and outbox via tokio-postgres
//! - `elasticsearch` (default) - search index via the official client
//!
//! The engine itself only depends on the traits in [`core`], so it can be
//! driven by any implementation of them.
//!
//! # Architecture
//!
//! - [`types`] - Sort specs, pagination and range filters
//! - [`model`] - Entity records and their index mappings
//! - [`error`] - Error types for all operations
//! - [`core`] - Store and index traits
//! - [`search`] - Field whitelists, query and aggregation builders, reindexing
//! - [`sync`] - Dual-write coordinator and outbox relay
//! - [`services`] - Per-entity services wiring it all together
//! - [`backends`] - PostgreSQL and Elasticsearch implementations
//!
//! # Search
//!
//! ```
//! use storefront_persistence::model::Product;
//! use storefront_persistence::search::QueryBuilder;
//! use storefront_persistence::types::{NumericRange, Pagination, parse_sort_by};
//!
//! let price = NumericRange::parse("price", None, Some("300000")).unwrap();
//! let request = QueryBuilder::for_entity::<Product>()
//!     .paginate(Pagination::new(0, 10).unwrap())
//!     .sort_by(parse_sort_by("price:desc,id"))
//!     .match_text("name", Some("shirt"))
//!     .numeric_range("price", price)
//!     .build()
//!     .unwrap();
//!
//! let body = request.to_json();
//! assert_eq!(body["sort"][0]["price"]["order"], "desc");
//! assert_eq!(body["query"]["bool"]["must"].as_array().unwrap().len(), 2);
//! ```
//!
//! Unknown sort fields are rejected rather than passed through:
//!
//! ```
//! use storefront_persistence::model::Invoice;
//! use storefront_persistence::search::QueryBuilder;
//! use storefront_persistence::types::parse_sort_by;
//!
//! let result = QueryBuilder::for_entity::<Invoice>()
//!     .sort_by(parse_sort_by("secret:desc"))
//!     .build();
//! assert!(result.is_err());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod model;
pub mod search;
pub mod services;
pub mod sync;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use model::{EntityKind, Invoice, Product, SearchEntity};
pub use types::{Pagination, SortDirection, SortField};

// Re-export core traits
pub use core::{Backend, BackendKind, OutboxStore, RelationalStore, SearchIndex};

// Re-export the engine entry points
pub use search::{BulkReindexer, QueryBuilder, ReindexReport, SearchHits};
pub use services::{CatalogService, InvoiceService};
pub use sync::{DualWriteCoordinator, OutboxRelay, SyncConfig, SyncMode};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
