//! Backend implementations.
//!
//! Each backend is gated behind a feature flag.
//!
//! | Backend | Feature | Role |
//! |---------|---------|------|
//! | PostgreSQL | `postgres` | Store of record, outbox ([`RelationalStore`](crate::core::RelationalStore), [`OutboxStore`](crate::core::OutboxStore)) |
//! | Elasticsearch | `elasticsearch` | Search index ([`SearchIndex`](crate::core::SearchIndex)) |

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
