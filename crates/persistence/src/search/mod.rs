//! Dynamic search over the mirrored entities.
//!
//! - [`fields`] - Per-entity whitelists from logical to physical field names
//! - [`query`] - Typed search request AST rendered to the engine's JSON DSL
//! - [`query_builder`] - Paginated, sorted, filtered search requests
//! - [`aggregation`] - Zero-hit metric requests
//! - [`response`] - Decoding hits back into records
//! - [`reindex`] - Full and alias-swapped rebuilds from the relational store

pub mod aggregation;
pub mod fields;
pub mod query;
pub mod query_builder;
pub mod reindex;
pub mod response;

pub use aggregation::{AggregationBuilder, metric_value};
pub use fields::{FieldWhitelist, INVOICE_FIELDS, PRODUCT_FIELDS};
pub use query::{Clause, Metric, MetricKind, RangeBounds, SearchRequest, SortClause};
pub use query_builder::QueryBuilder;
pub use reindex::{BulkReindexer, ItemFailure, ReindexConfig, ReindexReport};
pub use response::{SearchHits, parse_hits};
