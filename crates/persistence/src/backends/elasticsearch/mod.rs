//! Elasticsearch backend implementation.
//!
//! Elasticsearch holds the denormalized, searchable copy of each entity. The
//! backend implements [`SearchIndex`](crate::core::SearchIndex): index
//! administration, single-document writes with a refresh policy, bulk
//! indexing with per-item results, search, and alias management.
//!
//! # Index Structure
//!
//! Each entity has one index (or alias) named after it, e.g. `products`.
//! Alias-swapped rebuilds write to `{alias}_{yyyymmddHHMMSS}_{uuid8}` and
//! then repoint the alias.
//!
//! # Example
//!
//! ```ignore
//! use storefront_persistence::backends::elasticsearch::{ElasticsearchBackend, ElasticsearchConfig};
//!
//! let config = ElasticsearchConfig {
//!     nodes: vec!["http://localhost:9200".to_string()],
//!     ..Default::default()
//! };
//! let backend = ElasticsearchBackend::new(config)?;
//! backend.health_check().await?;
//! ```

mod backend;
mod schema;
mod storage;

pub use backend::{ElasticsearchAuth, ElasticsearchBackend, ElasticsearchConfig};
pub use schema::with_index_settings;
