//! Decoding search responses into entity records.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, StorageError, StorageResult};

/// A page of hits decoded into records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHits<T> {
    /// Total matching documents, when the engine reported it.
    pub total: Option<u64>,
    /// Decoded `_source` bodies, in hit order.
    pub items: Vec<T>,
}

impl<T> SearchHits<T> {
    /// Returns the number of hits on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Decodes `hits.hits[]._source` into records.
///
/// Every hit must decode; a document that does not match the record shape is
/// a serialization error, not a silently dropped hit.
pub fn parse_hits<T: DeserializeOwned>(body: &Value) -> StorageResult<SearchHits<T>> {
    let hits = body
        .get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(|h| h.as_array())
        .cloned()
        .unwrap_or_default();

    let total = body
        .get("hits")
        .and_then(|h| h.get("total"))
        .and_then(|t| t.get("value").or(Some(t)))
        .and_then(|v| v.as_u64());

    let mut items = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(source) = hit.get("_source") else {
            continue;
        };
        let item = serde_json::from_value(source.clone()).map_err(|e| {
            StorageError::Backend(BackendError::SerializationError {
                message: format!(
                    "hit {} does not decode: {}",
                    hit.get("_id").and_then(|id| id.as_str()).unwrap_or("?"),
                    e
                ),
            })
        })?;
        items.push(item);
    }

    Ok(SearchHits { total, items })
}
