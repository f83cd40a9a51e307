//! PostgreSQL backend implementation.
//!
//! PostgreSQL is the store of record. It holds the `products` and `invoices`
//! tables plus the `search_outbox` of pending index mutations, and uses
//! deadpool-postgres for connection pooling.
//!
//! # Example
//!
//! ```no_run
//! use storefront_persistence::backends::postgres::{PostgresBackend, PostgresConfig};
//!
//! # async fn main_example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = PostgresBackend::new(PostgresConfig::default()).await?;
//! backend.init_schema().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE products (
//!     id BIGSERIAL PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     price NUMERIC(12, 2) NOT NULL,
//!     discount_percentage INTEGER NOT NULL DEFAULT 0,
//!     stock INTEGER NOT NULL DEFAULT 0,
//!     image_url TEXT NOT NULL DEFAULT '',
//!     category_id BIGINT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE search_outbox (
//!     id BIGSERIAL PRIMARY KEY,
//!     entity TEXT NOT NULL,
//!     document_id TEXT NOT NULL,
//!     op TEXT NOT NULL,
//!     payload JSONB,
//!     attempts INTEGER NOT NULL DEFAULT 0,
//!     last_error TEXT,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     processed_at TIMESTAMPTZ,
//!     dead_at TIMESTAMPTZ
//! );
//! ```

mod backend;
pub(crate) mod schema;
mod storage;

pub use backend::{PostgresBackend, PostgresConfig, PostgresSslMode};
pub use storage::{PgEntity, select_list};
