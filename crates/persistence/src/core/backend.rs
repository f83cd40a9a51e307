//! Backend abstraction shared by the relational store and the search index.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::BackendError;

/// Identifies the type of backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// PostgreSQL database (store of record).
    Postgres,
    /// Elasticsearch (search projection).
    Elasticsearch,
    /// Custom or unknown backend.
    Custom(&'static str),
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Postgres => write!(f, "postgres"),
            BackendKind::Elasticsearch => write!(f, "elasticsearch"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Lifecycle operations every backend supports.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns a short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Verifies that the backend is reachable.
    async fn health_check(&self) -> Result<(), BackendError>;

    /// Prepares the backend for use (schema creation, migrations).
    async fn initialize(&self) -> Result<(), BackendError>;
}
