//! In-memory store and index used to exercise the sync engine without Docker.
//!
//! [`MemoryIndex`] interprets the subset of the search DSL the query and
//! aggregation builders emit: `bool.must` with `match_all`, `match`,
//! `multi_match` and `range`, plus `sort`, `from`, `size` and `sum`/`avg`
//! aggregations. Both doubles support fault injection.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::stream::{self, BoxStream};
use parking_lot::Mutex;
use serde_json::{Value, json};

use storefront_persistence::core::{
    BulkItem, BulkItemResult, BulkResponse, CreateIndexOutcome, DeleteOutcome, IndexMutation,
    OutboxEntry, OutboxStore, Refresh, RelationalStore, SearchIndex,
};
use storefront_persistence::error::{BackendError, ResourceError, StorageError, StorageResult};
use storefront_persistence::model::SearchEntity;

fn unavailable(backend: &str) -> StorageError {
    StorageError::Backend(BackendError::ConnectionFailed {
        backend_name: backend.to_string(),
        message: "injected failure".to_string(),
    })
}

// ============================================================================
// Relational store
// ============================================================================

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: OutboxEntry,
    processed_at: Option<DateTime<Utc>>,
    dead: bool,
}

struct StoreState<E> {
    rows: BTreeMap<i64, E>,
    next_id: i64,
    outbox: Vec<StoredEntry>,
    next_entry_id: i64,
    now: Option<DateTime<Utc>>,
}

/// A relational store with a transactional outbox, backed by a mutex.
pub struct MemoryStore<E: SearchEntity> {
    state: Mutex<StoreState<E>>,
    fail_writes: AtomicBool,
}

impl<E: SearchEntity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: SearchEntity> MemoryStore<E> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                rows: BTreeMap::new(),
                next_id: 1,
                outbox: Vec::new(),
                next_entry_id: 1,
                now: None,
            }),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Pins the timestamp stamped on subsequent writes.
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.state.lock().now = Some(now);
    }

    /// Makes every subsequent write fail before touching any row.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    /// Returns every row currently stored.
    pub fn rows(&self) -> Vec<E> {
        self.state.lock().rows.values().cloned().collect()
    }

    /// Returns all outbox entries, processed or not.
    pub fn outbox(&self) -> Vec<(OutboxEntry, bool)> {
        self.state
            .lock()
            .outbox
            .iter()
            .map(|stored| (stored.entry.clone(), stored.processed_at.is_some()))
            .collect()
    }

    /// Returns the number of entries neither applied nor dead-lettered.
    pub fn pending_count(&self) -> usize {
        self.state.lock().outbox.iter().filter(|e| e.is_pending()).count()
    }

    /// Returns the dead-lettered outbox entries.
    pub fn dead_entries(&self) -> Vec<OutboxEntry> {
        self.state
            .lock()
            .outbox
            .iter()
            .filter(|stored| stored.dead)
            .map(|stored| stored.entry.clone())
            .collect()
    }

    /// Moves every applied entry's processing time back by `age`.
    pub fn age_processed(&self, age: Duration) {
        let age = chrono::Duration::from_std(age).unwrap();
        for stored in self.state.lock().outbox.iter_mut() {
            if let Some(at) = stored.processed_at.as_mut() {
                *at -= age;
            }
        }
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(unavailable("memory-store"));
        }
        Ok(())
    }

    fn not_found(id: i64) -> StorageError {
        ResourceError::NotFound {
            entity: E::ENTITY.to_string(),
            id,
        }
        .into()
    }

    fn insert(&self, new: E::New, outbox: bool) -> StorageResult<E> {
        self.check_writable()?;
        let mut state = self.state.lock();
        let now = state.now.unwrap_or_else(Utc::now);
        let id = state.next_id;
        state.next_id += 1;

        let record = E::from_new(id, new, now);
        if outbox {
            let document = record.to_document()?;
            push_entry(&mut state, &record.document_id(), IndexMutation::Upsert { document });
        }
        state.rows.insert(id, record.clone());
        Ok(record)
    }

    fn patch(&self, id: i64, patch: E::Patch, outbox: bool) -> StorageResult<E> {
        self.check_writable()?;
        let mut state = self.state.lock();
        let now = state.now.unwrap_or_else(Utc::now);
        let mut record = state.rows.get(&id).cloned().ok_or_else(|| Self::not_found(id))?;
        record.apply_patch(patch, now);

        if outbox {
            let document = record.to_document()?;
            push_entry(&mut state, &record.document_id(), IndexMutation::Upsert { document });
        }
        state.rows.insert(id, record.clone());
        Ok(record)
    }

    fn remove(&self, id: i64, outbox: bool) -> StorageResult<()> {
        self.check_writable()?;
        let mut state = self.state.lock();
        let record = state.rows.remove(&id).ok_or_else(|| Self::not_found(id))?;
        if outbox {
            push_entry(&mut state, &record.document_id(), IndexMutation::Delete);
        }
        Ok(())
    }
}

fn push_entry<E: SearchEntity>(
    state: &mut StoreState<E>,
    document_id: &str,
    mutation: IndexMutation,
) {
    let id = state.next_entry_id;
    state.next_entry_id += 1;
    state.outbox.push(StoredEntry {
        entry: OutboxEntry {
            id,
            entity: E::ENTITY.to_string(),
            document_id: document_id.to_string(),
            mutation,
            attempts: 0,
            last_error: None,
            created_at: state.now.unwrap_or_else(Utc::now),
        },
        processed_at: None,
        dead: false,
    });
}

impl StoredEntry {
    fn is_pending(&self) -> bool {
        self.processed_at.is_none() && !self.dead
    }
}

#[async_trait]
impl<E: SearchEntity> RelationalStore<E> for MemoryStore<E> {
    fn backend_name(&self) -> &'static str {
        "memory-store"
    }

    async fn create(&self, new: E::New) -> StorageResult<E> {
        self.insert(new, false)
    }

    async fn read(&self, id: i64) -> StorageResult<Option<E>> {
        Ok(self.state.lock().rows.get(&id).cloned())
    }

    async fn update(&self, id: i64, patch: E::Patch) -> StorageResult<E> {
        self.patch(id, patch, false)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        self.remove(id, false)
    }

    fn stream_all(&self) -> BoxStream<'static, StorageResult<E>> {
        let rows: Vec<StorageResult<E>> = self.rows().into_iter().map(Ok).collect();
        Box::pin(stream::iter(rows))
    }

    async fn count(&self) -> StorageResult<u64> {
        Ok(self.state.lock().rows.len() as u64)
    }
}

#[async_trait]
impl<E: SearchEntity> OutboxStore<E> for MemoryStore<E> {
    async fn create_with_outbox(&self, new: E::New) -> StorageResult<E> {
        self.insert(new, true)
    }

    async fn update_with_outbox(&self, id: i64, patch: E::Patch) -> StorageResult<E> {
        self.patch(id, patch, true)
    }

    async fn delete_with_outbox(&self, id: i64) -> StorageResult<()> {
        self.remove(id, true)
    }

    async fn pending_outbox(&self, limit: usize) -> StorageResult<Vec<OutboxEntry>> {
        Ok(self
            .state
            .lock()
            .outbox
            .iter()
            .filter(|stored| stored.is_pending() && stored.entry.entity == E::ENTITY)
            .take(limit)
            .map(|stored| stored.entry.clone())
            .collect())
    }

    async fn mark_processed(&self, entry_id: i64) -> StorageResult<()> {
        let mut state = self.state.lock();
        if let Some(stored) = state.outbox.iter_mut().find(|e| e.entry.id == entry_id) {
            stored.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_failed(&self, entry_id: i64, error: &str) -> StorageResult<()> {
        let mut state = self.state.lock();
        if let Some(stored) = state.outbox.iter_mut().find(|e| e.entry.id == entry_id) {
            stored.entry.attempts += 1;
            stored.entry.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn mark_dead(&self, entry_id: i64, error: &str) -> StorageResult<()> {
        let mut state = self.state.lock();
        if let Some(stored) = state.outbox.iter_mut().find(|e| e.entry.id == entry_id) {
            stored.entry.attempts += 1;
            stored.entry.last_error = Some(error.to_string());
            stored.dead = true;
        }
        Ok(())
    }

    async fn purge_processed(&self, older_than: Duration) -> StorageResult<u64> {
        let Some(cutoff) = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return Ok(0);
        };
        let mut state = self.state.lock();
        let before = state.outbox.len();
        state.outbox.retain(|stored| {
            stored.entry.entity != E::ENTITY || stored.processed_at.is_none_or(|at| at >= cutoff)
        });
        Ok((before - state.outbox.len()) as u64)
    }
}

// ============================================================================
// Search index
// ============================================================================

#[derive(Default)]
struct IndexState {
    indices: BTreeMap<String, BTreeMap<String, Value>>,
    aliases: BTreeMap<String, Vec<String>>,
}

impl IndexState {
    fn name_taken(&self, name: &str) -> bool {
        self.indices.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Concrete indices behind a name.
    fn resolve(&self, name: &str) -> Vec<String> {
        match self.aliases.get(name) {
            Some(targets) => targets.clone(),
            None if self.indices.contains_key(name) => vec![name.to_string()],
            None => Vec::new(),
        }
    }

    /// The single index a document write lands in, auto-creating it like the engine does.
    fn write_target(&mut self, name: &str) -> String {
        let target = self
            .aliases
            .get(name)
            .and_then(|targets| targets.first().cloned())
            .unwrap_or_else(|| name.to_string());
        self.indices.entry(target.clone()).or_default();
        target
    }
}

/// A search index double with fault injection.
#[derive(Default)]
pub struct MemoryIndex {
    state: Mutex<IndexState>,
    mappings: Mutex<BTreeMap<String, Value>>,
    unavailable: AtomicBool,
    bulk_unavailable: AtomicBool,
    alias_swap_unavailable: AtomicBool,
    failures_remaining: AtomicU32,
    rejected_ids: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    bulk_calls: AtomicU32,
}

impl MemoryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Makes bulk requests fail as a whole while other calls succeed.
    pub fn set_bulk_unavailable(&self, unavailable: bool) {
        self.bulk_unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Makes alias swaps fail while other calls succeed.
    pub fn set_alias_swap_unavailable(&self, unavailable: bool) {
        self.alias_swap_unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Makes the next `count` document writes fail.
    pub fn fail_next_writes(&self, count: u32) {
        self.failures_remaining.store(count, AtomicOrdering::SeqCst);
    }

    /// Makes bulk requests and single-document writes reject the given ids.
    pub fn reject_documents(&self, ids: &[&str]) {
        let mut rejected = self.rejected_ids.lock();
        rejected.extend(ids.iter().map(|id| id.to_string()));
    }

    /// Delays every document write.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Returns the number of bulk requests received.
    pub fn bulk_calls(&self) -> u32 {
        self.bulk_calls.load(AtomicOrdering::SeqCst)
    }

    /// Returns a stored document by index (or alias) and id.
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        let state = self.state.lock();
        state
            .resolve(index)
            .iter()
            .find_map(|name| state.indices.get(name).and_then(|docs| docs.get(id)).cloned())
    }

    /// Returns the number of documents visible through a name.
    pub fn document_count(&self, index: &str) -> usize {
        let state = self.state.lock();
        state
            .resolve(index)
            .iter()
            .filter_map(|name| state.indices.get(name))
            .map(BTreeMap::len)
            .sum()
    }

    /// Returns the concrete index names.
    pub fn index_names(&self) -> Vec<String> {
        self.state.lock().indices.keys().cloned().collect()
    }

    /// Returns the body an index was created with.
    pub fn mapping(&self, index: &str) -> Option<Value> {
        self.mappings.lock().get(index).cloned()
    }

    /// Seeds a document directly, bypassing fault injection.
    pub fn seed(&self, index: &str, id: &str, document: Value) {
        let mut state = self.state.lock();
        let target = state.write_target(index);
        if let Some(docs) = state.indices.get_mut(&target) {
            docs.insert(id.to_string(), document);
        }
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(unavailable("memory-index"));
        }
        Ok(())
    }

    async fn before_write(&self) -> StorageResult<()> {
        self.check_available()?;
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let injected = self
            .failures_remaining
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(unavailable("memory-index"));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    fn backend_name(&self) -> &'static str {
        "memory-index"
    }

    async fn index_exists(&self, index: &str) -> StorageResult<bool> {
        self.check_available()?;
        Ok(self.state.lock().name_taken(index))
    }

    async fn create_index(&self, index: &str, body: Value) -> StorageResult<CreateIndexOutcome> {
        self.check_available()?;
        let mut state = self.state.lock();
        if state.name_taken(index) {
            return Ok(CreateIndexOutcome::AlreadyExists);
        }
        state.indices.insert(index.to_string(), BTreeMap::new());
        self.mappings.lock().insert(index.to_string(), body);
        Ok(CreateIndexOutcome::Created)
    }

    async fn delete_index(&self, index: &str) -> StorageResult<()> {
        self.check_available()?;
        let mut state = self.state.lock();
        state.indices.remove(index);
        for targets in state.aliases.values_mut() {
            targets.retain(|t| t != index);
        }
        state.aliases.retain(|_, targets| !targets.is_empty());
        Ok(())
    }

    async fn refresh(&self, _index: &str) -> StorageResult<()> {
        self.check_available()
    }

    async fn index_document(
        &self,
        index: &str,
        document_id: &str,
        document: Value,
        _refresh: Refresh,
    ) -> StorageResult<()> {
        self.before_write().await?;
        if self.rejected_ids.lock().contains(document_id) {
            return Err(StorageError::Backend(BackendError::Internal {
                backend_name: "memory-index".to_string(),
                message: "status 400: mapper_parsing_exception: failed to parse".to_string(),
                source: None,
            }));
        }
        let mut state = self.state.lock();
        let target = state.write_target(index);
        if let Some(docs) = state.indices.get_mut(&target) {
            docs.insert(document_id.to_string(), document);
        }
        Ok(())
    }

    async fn delete_document(
        &self,
        index: &str,
        document_id: &str,
        _refresh: Refresh,
    ) -> StorageResult<DeleteOutcome> {
        self.before_write().await?;
        let mut state = self.state.lock();
        let targets = state.resolve(index);
        let mut removed = false;
        for target in targets {
            if let Some(docs) = state.indices.get_mut(&target) {
                removed |= docs.remove(document_id).is_some();
            }
        }
        Ok(if removed {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn search(&self, index: &str, body: Value) -> StorageResult<Value> {
        self.check_available()?;
        let state = self.state.lock();
        let mut hits: Vec<(String, Value)> = state
            .resolve(index)
            .iter()
            .filter_map(|name| state.indices.get(name))
            .flat_map(|docs| docs.iter().map(|(id, doc)| (id.clone(), doc.clone())))
            .collect();
        drop(state);

        let must = body["query"]["bool"]["must"].as_array().cloned().unwrap_or_default();
        hits.retain(|(_, doc)| must.iter().all(|clause| matches_clause(clause, doc)));

        if let Some(sort) = body["sort"].as_array() {
            hits.sort_by(|(_, a), (_, b)| compare_by(sort, a, b));
        }

        let total = hits.len();
        let mut response = json!({
            "hits": { "total": { "value": total, "relation": "eq" }, "hits": [] }
        });

        if let Some(aggs) = body["aggs"].as_object() {
            let mut results = serde_json::Map::new();
            for (name, agg) in aggs {
                results.insert(name.clone(), json!({ "value": metric(agg, &hits) }));
            }
            response["aggregations"] = Value::Object(results);
        }

        let from = body["from"].as_u64().unwrap_or(0) as usize;
        let size = body["size"].as_u64().unwrap_or(10) as usize;
        let page: Vec<Value> = hits
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(id, doc)| json!({ "_id": id, "_source": doc }))
            .collect();
        response["hits"]["hits"] = Value::Array(page);
        Ok(response)
    }

    async fn bulk(&self, index: &str, items: Vec<BulkItem>) -> StorageResult<BulkResponse> {
        self.check_available()?;
        self.bulk_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.bulk_unavailable.load(AtomicOrdering::SeqCst) {
            return Err(unavailable("memory-index"));
        }
        let rejected = self.rejected_ids.lock().clone();
        let mut state = self.state.lock();
        let target = state.write_target(index);

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            if rejected.contains(&item.document_id) {
                results.push(BulkItemResult {
                    document_id: item.document_id,
                    status: 400,
                    error: Some("mapper_parsing_exception: failed to parse".to_string()),
                });
                continue;
            }
            if let Some(docs) = state.indices.get_mut(&target) {
                let status = if docs.insert(item.document_id.clone(), item.document).is_some() {
                    200
                } else {
                    201
                };
                results.push(BulkItemResult {
                    document_id: item.document_id,
                    status,
                    error: None,
                });
            }
        }
        Ok(BulkResponse { items: results })
    }

    async fn alias_targets(&self, alias: &str) -> StorageResult<Vec<String>> {
        self.check_available()?;
        Ok(self.state.lock().aliases.get(alias).cloned().unwrap_or_default())
    }

    async fn swap_alias(&self, alias: &str, remove: &[String], add: &str) -> StorageResult<()> {
        self.check_available()?;
        if self.alias_swap_unavailable.load(AtomicOrdering::SeqCst) {
            return Err(unavailable("memory-index"));
        }
        let mut state = self.state.lock();
        // A concrete index squatting on the alias name is dropped in the same step.
        if remove.is_empty() && state.indices.contains_key(alias) {
            state.indices.remove(alias);
        }
        let targets = state.aliases.entry(alias.to_string()).or_default();
        targets.retain(|t| !remove.contains(t));
        if !targets.iter().any(|t| t == add) {
            targets.push(add.to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Query interpretation
// ============================================================================

/// Looks up a possibly dotted field; `.keyword` and `.as_text` address the parent.
fn field_value<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    let base = field
        .strip_suffix(".keyword")
        .or_else(|| field.strip_suffix(".as_text"))
        .unwrap_or(field);
    doc.get(base)
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Default `match` semantics: any query term equals any document term.
/// Edge-n-gram subfields also match on term prefixes.
fn field_matches(doc: &Value, field: &str, query: &str) -> bool {
    let Some(value) = field_value(doc, field) else {
        return false;
    };
    let doc_terms = tokens(&value_text(value));
    let prefix = field.ends_with(".as_text");
    tokens(query).iter().any(|term| {
        doc_terms
            .iter()
            .any(|t| t == term || (prefix && t.starts_with(term.as_str())))
    })
}

fn matches_clause(clause: &Value, doc: &Value) -> bool {
    if clause.get("match_all").is_some() {
        return true;
    }
    if let Some(m) = clause.get("match").and_then(Value::as_object) {
        return m
            .iter()
            .all(|(field, query)| field_matches(doc, field, &value_text(query)));
    }
    if let Some(mm) = clause.get("multi_match") {
        let query = value_text(&mm["query"]);
        return mm["fields"]
            .as_array()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|field| field_matches(doc, field, &query))
            })
            .unwrap_or(false);
    }
    if let Some(r) = clause.get("range").and_then(Value::as_object) {
        return r.iter().all(|(field, bounds)| in_range(doc, field, bounds));
    }
    false
}

fn parse_bound_date(value: &Value) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.as_str()?, "%Y-%m-%dT%H:%M:%S").ok()
}

fn parse_doc_date(value: &Value) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|dt| dt.naive_utc())
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn in_range(doc: &Value, field: &str, bounds: &Value) -> bool {
    let Some(value) = field_value(doc, field) else {
        return false;
    };

    if bounds.get("format").is_some() {
        let Some(actual) = parse_doc_date(value) else {
            return false;
        };
        let lower = bounds.get("gte").and_then(parse_bound_date);
        let upper = bounds.get("lte").and_then(parse_bound_date);
        return lower.is_none_or(|gte| actual >= gte) && upper.is_none_or(|lte| actual <= lte);
    }

    let Some(actual) = as_number(value) else {
        return false;
    };
    let lower = bounds.get("gte").and_then(as_number);
    let upper = bounds.get("lte").and_then(as_number);
    lower.is_none_or(|gte| actual >= gte) && upper.is_none_or(|lte| actual <= lte)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => value_text(a).cmp(&value_text(b)),
        },
    }
}

fn compare_by(sort: &[Value], a: &Value, b: &Value) -> Ordering {
    for key in sort {
        let Some((field, spec)) = key.as_object().and_then(|o| o.iter().next()) else {
            continue;
        };
        let ordering = compare_values(field_value(a, field), field_value(b, field));
        let ordering = if spec["order"] == "desc" {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn metric(agg: &Value, hits: &[(String, Value)]) -> Value {
    let (kind, spec) = match agg.as_object().and_then(|o| o.iter().next()) {
        Some(entry) => entry,
        None => return Value::Null,
    };
    let field = spec["field"].as_str().unwrap_or_default();
    let values: Vec<f64> = hits
        .iter()
        .filter_map(|(_, doc)| field_value(doc, field).and_then(as_number))
        .collect();

    match kind.as_str() {
        "sum" => json!(values.iter().sum::<f64>()),
        "avg" if values.is_empty() => Value::Null,
        "avg" => json!(values.iter().sum::<f64>() / values.len() as f64),
        _ => Value::Null,
    }
}
