//! Error types for the persistence layer.
//!
//! This module defines all error types used throughout the sync engine,
//! following a hierarchy that separates validation errors, missing records,
//! dual-store divergence and backend transport failures.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage and sync operations.
///
/// This enum encompasses all possible errors that can occur during persistence
/// operations, organized by category.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Record state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Validation errors, raised before any store or index access
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Errors specific to keeping the search index in sync
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns true if this error is caused by client input rather than the stores.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StorageError::Validation(_) | StorageError::Resource(ResourceError::NotFound { .. })
        )
    }

    /// Returns true if the relational write committed but the index did not follow.
    pub fn is_divergence(&self) -> bool {
        matches!(self, StorageError::Sync(SyncError::IndexWriteFailed { .. }))
    }
}

/// Errors related to record state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested record was not found in the relational store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: i64 },
}

/// Errors related to client-supplied query and filter values.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A sort or filter field is not in the entity's whitelist.
    #[error("unknown field '{field}' for {entity}")]
    UnknownField { entity: String, field: String },

    /// A filter value could not be parsed.
    #[error("invalid value for {parameter}: {message}")]
    InvalidFilter { parameter: String, message: String },

    /// A record field failed validation on create or update.
    #[error("invalid {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Offset or limit out of bounds.
    #[error("invalid pagination: {message}")]
    InvalidPagination { message: String },
}

/// Errors raised while propagating relational changes to the search index.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The relational mutation committed, but the index write did not.
    ///
    /// The two stores have diverged until the next reindex or outbox relay pass.
    #[error("{entity} {id} was written to the database but indexing failed: {message}")]
    IndexWriteFailed {
        entity: String,
        id: i64,
        message: String,
    },

    /// A full reindex was attempted against an index that already exists.
    #[error("index {index} already exists; refusing to overwrite its mapping")]
    IndexAlreadyExists { index: String },
}

/// Errors originating from a database or search backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// The backend answered with a non-success status.
    #[error("{backend_name} request failed with status {status}: {body}")]
    RequestFailed {
        backend_name: String,
        status: u16,
        body: String,
    },

    /// A backend call exceeded its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// Implement conversions from common error types

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for StorageError {
    fn from(err: tokio_postgres::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "postgres".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}
