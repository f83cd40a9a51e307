//! Offset pagination for search requests.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default page size when the caller does not supply one.
pub const DEFAULT_LIMIT: u32 = 5;

/// Upper bound on page size.
pub const MAX_LIMIT: u32 = 10;

/// Offset pagination for a search request (`from`/`size` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Number of hits to skip.
    pub offset: u32,

    /// Maximum number of hits to return.
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Creates pagination, checking the limit against [`MAX_LIMIT`].
    pub fn new(offset: u32, limit: u32) -> Result<Self, ValidationError> {
        Self::bounded(offset, limit, MAX_LIMIT)
    }

    /// Creates pagination with a caller-chosen upper bound on the limit.
    pub fn bounded(offset: u32, limit: u32, max_limit: u32) -> Result<Self, ValidationError> {
        if limit == 0 || limit > max_limit {
            return Err(ValidationError::InvalidPagination {
                message: format!("limit must be between 1 and {}, got {}", max_limit, limit),
            });
        }
        Ok(Self { offset, limit })
    }

    /// Builds pagination from optional request values, applying defaults.
    pub fn from_params(offset: Option<u32>, limit: Option<u32>) -> Result<Self, ValidationError> {
        Self::new(offset.unwrap_or(0), limit.unwrap_or(DEFAULT_LIMIT))
    }
}
