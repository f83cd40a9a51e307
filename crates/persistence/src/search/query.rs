//! Typed search query AST.
//!
//! Queries are assembled from these tagged variants and rendered to the
//! engine's JSON DSL in one place, so field names and clause shapes are never
//! spelled out ad hoc by callers.

use serde_json::{Map, Value, json};

use crate::types::{
    DateRange, ENGINE_DATE_FORMAT, NumericRange, SortDirection, format_timestamp,
};

/// Bounds of a range clause.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeBounds {
    /// Decimal bounds.
    Numeric(NumericRange),
    /// Timestamp bounds, sent with an explicit date format.
    Date(DateRange),
}

impl RangeBounds {
    /// Returns true if neither bound is set.
    pub fn is_empty(&self) -> bool {
        match self {
            RangeBounds::Numeric(range) => range.is_empty(),
            RangeBounds::Date(range) => range.is_empty(),
        }
    }

    fn to_json(&self) -> Value {
        let mut bounds = Map::new();
        match self {
            RangeBounds::Numeric(range) => {
                if let Some(gte) = range.gte {
                    bounds.insert("gte".to_string(), json!(gte.to_string()));
                }
                if let Some(lte) = range.lte {
                    bounds.insert("lte".to_string(), json!(lte.to_string()));
                }
            }
            RangeBounds::Date(range) => {
                if let Some(gte) = &range.gte {
                    bounds.insert("gte".to_string(), json!(format_timestamp(gte)));
                }
                if let Some(lte) = &range.lte {
                    bounds.insert("lte".to_string(), json!(format_timestamp(lte)));
                }
                bounds.insert("format".to_string(), json!(ENGINE_DATE_FORMAT));
            }
        }
        Value::Object(bounds)
    }
}

/// A single `must` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Matches every document.
    MatchAll,
    /// Full-text match against one field.
    Match {
        /// Physical field.
        field: String,
        /// Query text.
        text: String,
    },
    /// Full-text match across several fields.
    MultiMatch {
        /// Physical fields.
        fields: Vec<String>,
        /// Query text.
        text: String,
    },
    /// Inclusive range on one field.
    Range {
        /// Physical field.
        field: String,
        /// Bounds; at least one is set.
        bounds: RangeBounds,
    },
}

impl Clause {
    /// Renders the clause to the engine DSL.
    pub fn to_json(&self) -> Value {
        match self {
            Clause::MatchAll => json!({ "match_all": {} }),
            Clause::Match { field, text } => json!({ "match": { field.as_str(): text } }),
            Clause::MultiMatch { fields, text } => json!({
                "multi_match": {
                    "query": text,
                    "fields": fields,
                }
            }),
            Clause::Range { field, bounds } => json!({
                "range": { field.as_str(): bounds.to_json() }
            }),
        }
    }
}

/// A sort key on a physical, already-whitelisted field.
#[derive(Debug, Clone, PartialEq)]
pub struct SortClause {
    /// Physical field.
    pub field: &'static str,
    /// Direction.
    pub direction: SortDirection,
}

impl SortClause {
    fn to_json(&self) -> Value {
        json!({ self.field: { "order": self.direction.as_str() } })
    }
}

/// Metric aggregation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Sum of a numeric field.
    Sum,
    /// Mean of a numeric field.
    Avg,
}

impl MetricKind {
    fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Sum => "sum",
            MetricKind::Avg => "avg",
        }
    }
}

/// A named metric aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Aggregation name in the response.
    pub name: String,
    /// Metric kind.
    pub kind: MetricKind,
    /// Numeric field.
    pub field: String,
}

/// A complete search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Conjunctive filters. Rendered as `match_all` when empty.
    pub must: Vec<Clause>,
    /// Sort keys in precedence order.
    pub sort: Vec<SortClause>,
    /// Hits to skip.
    pub from: Option<u32>,
    /// Hits to return; zero for aggregation-only requests.
    pub size: u32,
    /// Metric aggregations.
    pub aggs: Vec<Metric>,
}

impl SearchRequest {
    /// Returns the effective `must` clauses; never empty.
    pub fn must_clauses(&self) -> Vec<Clause> {
        if self.must.is_empty() {
            vec![Clause::MatchAll]
        } else {
            self.must.clone()
        }
    }

    /// Renders the request body.
    pub fn to_json(&self) -> Value {
        let must: Vec<Value> = self.must_clauses().iter().map(Clause::to_json).collect();

        let mut body = json!({
            "query": { "bool": { "must": must } },
            "size": self.size,
        });

        if let Some(from) = self.from {
            body["from"] = json!(from);
        }

        if !self.sort.is_empty() {
            body["sort"] = Value::Array(self.sort.iter().map(SortClause::to_json).collect());
        }

        if !self.aggs.is_empty() {
            let mut aggs = Map::new();
            for metric in &self.aggs {
                aggs.insert(
                    metric.name.clone(),
                    json!({ metric.kind.as_str(): { "field": metric.field } }),
                );
            }
            body["aggs"] = Value::Object(aggs);
        } else {
            body["track_total_hits"] = json!(true);
        }

        body
    }
}
