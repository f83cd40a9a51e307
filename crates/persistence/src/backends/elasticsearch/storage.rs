//! SearchIndex implementation for Elasticsearch.

use async_trait::async_trait;
use elasticsearch::http::request::JsonBody;
use elasticsearch::params::Refresh as EsRefresh;
use elasticsearch::{BulkParts, DeleteParts, IndexParts, SearchParts};
use serde_json::{Value, json};

use crate::core::{
    BulkItem, BulkItemResult, BulkResponse, CreateIndexOutcome, DeleteOutcome, Refresh,
    SearchIndex,
};
use crate::error::StorageResult;

use super::backend::{ElasticsearchBackend, internal_error, request_failed};
use super::schema;

fn es_refresh(refresh: Refresh) -> EsRefresh {
    match refresh {
        Refresh::True => EsRefresh::True,
        Refresh::False => EsRefresh::False,
        Refresh::WaitFor => EsRefresh::WaitFor,
    }
}

/// Builds the NDJSON lines of a bulk `index` request.
fn bulk_body(items: Vec<BulkItem>) -> Vec<JsonBody<Value>> {
    let mut body = Vec::with_capacity(items.len() * 2);
    for item in items {
        body.push(JsonBody::new(json!({ "index": { "_id": item.document_id } })));
        body.push(JsonBody::new(item.document));
    }
    body
}

/// Extracts per-item outcomes from a bulk response.
fn parse_bulk_response(body: &Value) -> BulkResponse {
    let items = body
        .get("items")
        .and_then(|items| items.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object()?.values().next())
                .map(|result| BulkItemResult {
                    document_id: result
                        .get("_id")
                        .and_then(|id| id.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    status: result
                        .get("status")
                        .and_then(|s| s.as_u64())
                        .and_then(|s| u16::try_from(s).ok())
                        .unwrap_or(0),
                    error: result.get("error").map(|error| {
                        match (
                            error.get("type").and_then(|t| t.as_str()),
                            error.get("reason").and_then(|r| r.as_str()),
                        ) {
                            (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
                            _ => error.to_string(),
                        }
                    }),
                })
                .collect()
        })
        .unwrap_or_default();

    BulkResponse { items }
}

#[async_trait]
impl SearchIndex for ElasticsearchBackend {
    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn index_exists(&self, index: &str) -> StorageResult<bool> {
        schema::index_exists(self, index).await
    }

    async fn create_index(&self, index: &str, body: Value) -> StorageResult<CreateIndexOutcome> {
        schema::create_index(self, index, body).await
    }

    async fn delete_index(&self, index: &str) -> StorageResult<()> {
        schema::delete_index(self, index).await
    }

    async fn refresh(&self, index: &str) -> StorageResult<()> {
        schema::refresh(self, index).await
    }

    async fn index_document(
        &self,
        index: &str,
        document_id: &str,
        document: Value,
        refresh: Refresh,
    ) -> StorageResult<()> {
        let response = self
            .client()
            .index(IndexParts::IndexId(index, document_id))
            .refresh(es_refresh(refresh))
            .body(document)
            .send()
            .await
            .map_err(|e| internal_error(format!("Failed to index document: {}", e)))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(request_failed(status.as_u16(), body));
        }

        tracing::debug!(index = %index, document_id = %document_id, "Indexed document");
        Ok(())
    }

    async fn delete_document(
        &self,
        index: &str,
        document_id: &str,
        refresh: Refresh,
    ) -> StorageResult<DeleteOutcome> {
        let response = self
            .client()
            .delete(DeleteParts::IndexId(index, document_id))
            .refresh(es_refresh(refresh))
            .send()
            .await
            .map_err(|e| internal_error(format!("Failed to delete document: {}", e)))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(DeleteOutcome::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(request_failed(status.as_u16(), body));
        }

        Ok(DeleteOutcome::Deleted)
    }

    async fn search(&self, index: &str, body: Value) -> StorageResult<Value> {
        let response = self
            .client()
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| internal_error(format!("Search failed: {}", e)))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(request_failed(status.as_u16(), body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| internal_error(format!("Failed to parse search response: {}", e)))
    }

    async fn bulk(&self, index: &str, items: Vec<BulkItem>) -> StorageResult<BulkResponse> {
        if items.is_empty() {
            return Ok(BulkResponse::default());
        }

        let response = self
            .client()
            .bulk(BulkParts::Index(index))
            .body(bulk_body(items))
            .send()
            .await
            .map_err(|e| internal_error(format!("Bulk request failed: {}", e)))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(request_failed(status.as_u16(), body));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| internal_error(format!("Failed to parse bulk response: {}", e)))?;

        Ok(parse_bulk_response(&body))
    }

    async fn alias_targets(&self, alias: &str) -> StorageResult<Vec<String>> {
        schema::alias_targets(self, alias).await
    }

    async fn swap_alias(&self, alias: &str, remove: &[String], add: &str) -> StorageResult<()> {
        schema::swap_alias(self, alias, remove, add).await
    }
}
