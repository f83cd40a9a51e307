//! Zero-hit metric aggregation requests.

use serde_json::Value;

use crate::types::DateRange;

use super::query::{Clause, Metric, MetricKind, RangeBounds, SearchRequest};

/// Assembles an aggregation-only request (`size = 0`).
///
/// Filtering follows the same rules as [`QueryBuilder`](super::QueryBuilder):
/// one clause per present filter, `match_all` otherwise.
#[derive(Debug, Default)]
pub struct AggregationBuilder {
    clauses: Vec<Clause>,
    metrics: Vec<Metric>,
}

impl AggregationBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the aggregation to a date window if any bound is set.
    pub fn date_range(mut self, field: &str, range: DateRange) -> Self {
        if !range.is_empty() {
            self.clauses.push(Clause::Range {
                field: field.to_string(),
                bounds: RangeBounds::Date(range),
            });
        }
        self
    }

    /// Adds a `sum` metric.
    pub fn sum(self, name: &str, field: &str) -> Self {
        self.metric(name, MetricKind::Sum, field)
    }

    /// Adds an `avg` metric.
    pub fn avg(self, name: &str, field: &str) -> Self {
        self.metric(name, MetricKind::Avg, field)
    }

    fn metric(mut self, name: &str, kind: MetricKind, field: &str) -> Self {
        self.metrics.push(Metric {
            name: name.to_string(),
            kind,
            field: field.to_string(),
        });
        self
    }

    /// Produces the request.
    pub fn build(self) -> SearchRequest {
        let must = if self.clauses.is_empty() {
            vec![Clause::MatchAll]
        } else {
            self.clauses
        };

        SearchRequest {
            must,
            sort: Vec::new(),
            from: None,
            size: 0,
            aggs: self.metrics,
        }
    }
}

/// Reads a metric value from a search response.
///
/// Returns `None` when the aggregation is missing or its value is `null`
/// (e.g. `avg` over zero documents).
pub fn metric_value(response: &Value, name: &str) -> Option<f64> {
    response
        .get("aggregations")
        .and_then(|aggs| aggs.get(name))
        .and_then(|agg| agg.get("value"))
        .and_then(Value::as_f64)
}
