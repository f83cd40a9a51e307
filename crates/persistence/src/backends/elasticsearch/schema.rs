//! Index administration: creation, deletion, refresh and aliases.

use elasticsearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesGetAliasParts,
    IndicesRefreshParts,
};
use serde_json::{Value, json};

use crate::core::CreateIndexOutcome;
use crate::error::StorageResult;

use super::backend::{ElasticsearchBackend, ElasticsearchConfig, internal_error, request_failed};

/// Fills in shard and replica counts the mapping body leaves unset.
pub fn with_index_settings(config: &ElasticsearchConfig, mut body: Value) -> Value {
    if let Some(obj) = body.as_object_mut() {
        let settings = obj.entry("settings").or_insert_with(|| json!({}));
        if let Some(settings) = settings.as_object_mut() {
            settings
                .entry("number_of_shards")
                .or_insert_with(|| json!(config.number_of_shards));
            settings
                .entry("number_of_replicas")
                .or_insert_with(|| json!(config.number_of_replicas));
        }
    }
    body
}

/// True if a create failure means the name is already taken, by an index or an alias.
fn is_name_taken(body: &str) -> bool {
    body.contains("resource_already_exists_exception")
        || (body.contains("invalid_index_name_exception") && body.contains("already exists"))
}

/// Creates an index in a single call; an existing index is reported, not replaced.
pub async fn create_index(
    backend: &ElasticsearchBackend,
    index: &str,
    body: Value,
) -> StorageResult<CreateIndexOutcome> {
    let body = with_index_settings(backend.config(), body);

    let response = backend
        .client()
        .indices()
        .create(IndicesCreateParts::Index(index))
        .body(body)
        .send()
        .await
        .map_err(|e| internal_error(format!("Failed to create index {}: {}", index, e)))?;

    let status = response.status_code();
    if status.is_success() {
        tracing::debug!("Created Elasticsearch index '{}'", index);
        return Ok(CreateIndexOutcome::Created);
    }

    let body = response.text().await.unwrap_or_default();
    if is_name_taken(&body) {
        return Ok(CreateIndexOutcome::AlreadyExists);
    }
    Err(request_failed(status.as_u16(), body))
}

/// Returns true if an index or alias named `index` exists.
pub async fn index_exists(backend: &ElasticsearchBackend, index: &str) -> StorageResult<bool> {
    let response = backend
        .client()
        .indices()
        .exists(IndicesExistsParts::Index(&[index]))
        .send()
        .await
        .map_err(|e| internal_error(format!("Failed to check index {}: {}", index, e)))?;

    Ok(response.status_code().is_success())
}

/// Deletes an index. A missing index is not an error.
pub async fn delete_index(backend: &ElasticsearchBackend, index: &str) -> StorageResult<()> {
    let response = backend
        .client()
        .indices()
        .delete(IndicesDeleteParts::Index(&[index]))
        .send()
        .await
        .map_err(|e| internal_error(format!("Failed to delete index {}: {}", index, e)))?;

    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        // 404 is OK (index doesn't exist)
        if !body.contains("index_not_found_exception") {
            return Err(request_failed(status.as_u16(), body));
        }
    }

    tracing::debug!("Deleted Elasticsearch index '{}'", index);
    Ok(())
}

/// Makes recently written documents visible to search.
pub async fn refresh(backend: &ElasticsearchBackend, index: &str) -> StorageResult<()> {
    let response = backend
        .client()
        .indices()
        .refresh(IndicesRefreshParts::Index(&[index]))
        .send()
        .await
        .map_err(|e| internal_error(format!("Failed to refresh index {}: {}", index, e)))?;

    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(request_failed(status.as_u16(), body));
    }
    Ok(())
}

/// Physical indices `alias` currently points at; empty if there is no such alias.
pub async fn alias_targets(backend: &ElasticsearchBackend, alias: &str) -> StorageResult<Vec<String>> {
    let response = backend
        .client()
        .indices()
        .get_alias(IndicesGetAliasParts::Name(&[alias]))
        .send()
        .await
        .map_err(|e| internal_error(format!("Failed to read alias {}: {}", alias, e)))?;

    let status = response.status_code();
    if status.as_u16() == 404 {
        return Ok(Vec::new());
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(request_failed(status.as_u16(), body));
    }

    let body = response
        .json::<Value>()
        .await
        .map_err(|e| internal_error(format!("Failed to parse alias response: {}", e)))?;

    let mut targets: Vec<String> = body
        .as_object()
        .map(|indices| indices.keys().cloned().collect())
        .unwrap_or_default();
    targets.sort();
    Ok(targets)
}

/// Builds the `_aliases` actions that move `alias` from `remove` to `add`.
///
/// When `drop_concrete` is set, a concrete index named `alias` is removed in
/// the same request so the alias can take its name.
pub fn alias_actions(alias: &str, remove: &[String], add: &str, drop_concrete: bool) -> Value {
    let mut actions: Vec<Value> = remove
        .iter()
        .map(|index| json!({ "remove": { "index": index, "alias": alias } }))
        .collect();
    if drop_concrete {
        actions.push(json!({ "remove_index": { "index": alias } }));
    }
    actions.push(json!({ "add": { "index": add, "alias": alias } }));
    json!({ "actions": actions })
}

/// Atomically repoints `alias` at `add`.
pub async fn swap_alias(
    backend: &ElasticsearchBackend,
    alias: &str,
    remove: &[String],
    add: &str,
) -> StorageResult<()> {
    let drop_concrete = remove.is_empty() && index_exists(backend, alias).await?;
    let body = alias_actions(alias, remove, add, drop_concrete);

    let response = backend
        .client()
        .indices()
        .update_aliases()
        .body(body)
        .send()
        .await
        .map_err(|e| internal_error(format!("Failed to update alias {}: {}", alias, e)))?;

    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(request_failed(status.as_u16(), body));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_are_merged() {
        let config = ElasticsearchConfig {
            number_of_replicas: 0,
            ..Default::default()
        };
        let body = with_index_settings(
            &config,
            json!({
                "settings": { "analysis": { "analyzer": {} } },
                "mappings": { "properties": {} }
            }),
        );
        assert_eq!(body["settings"]["number_of_shards"], 1);
        assert_eq!(body["settings"]["number_of_replicas"], 0);
        assert!(body["settings"]["analysis"].is_object());

        let body = with_index_settings(&config, json!({ "mappings": {} }));
        assert_eq!(body["settings"]["number_of_shards"], 1);
    }

    #[test]
    fn test_name_taken_detection() {
        assert!(is_name_taken(
            r#"{"error":{"type":"resource_already_exists_exception"}}"#
        ));
        assert!(is_name_taken(
            r#"{"error":{"type":"invalid_index_name_exception","reason":"Invalid index name [products], already exists as alias"}}"#
        ));
        assert!(!is_name_taken(r#"{"error":{"type":"mapper_parsing_exception"}}"#));
    }

    #[test]
    fn test_alias_actions() {
        let body = alias_actions(
            "products",
            &["products_20240101000000_aaaaaaaa".to_string()],
            "products_20240201000000_bbbbbbbb",
            false,
        );
        let actions = body["actions"].as_array().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0]["remove"]["index"], "products_20240101000000_aaaaaaaa");
        assert_eq!(actions[1]["add"]["alias"], "products");

        let body = alias_actions("products", &[], "products_new", true);
        assert_eq!(body["actions"][0]["remove_index"]["index"], "products");
    }
}
