//! Builds paginated, sorted search requests from loosely-typed parameters.

use crate::error::ValidationError;
use crate::model::SearchEntity;
use crate::types::{DateRange, NumericRange, Pagination, SortField};

use super::fields::FieldWhitelist;
use super::query::{Clause, RangeBounds, SearchRequest, SortClause};

/// Assembles a `bool`/`must` search request.
///
/// Each present filter contributes one clause; when none is present the
/// request falls back to `match_all`. Sort fields are resolved through the
/// entity's whitelist when [`build`](Self::build) is called, and an unknown
/// field fails the whole request before anything is sent.
#[derive(Debug)]
pub struct QueryBuilder {
    whitelist: &'static FieldWhitelist,
    clauses: Vec<Clause>,
    sort: Vec<SortField>,
    pagination: Pagination,
}

impl QueryBuilder {
    /// Creates a builder for the given whitelist.
    pub fn new(whitelist: &'static FieldWhitelist) -> Self {
        Self {
            whitelist,
            clauses: Vec::new(),
            sort: Vec::new(),
            pagination: Pagination::default(),
        }
    }

    /// Creates a builder for an entity type.
    pub fn for_entity<E: SearchEntity>() -> Self {
        Self::new(E::whitelist())
    }

    /// Sets `from`/`size`.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Sets the sort fields, in precedence order.
    pub fn sort_by(mut self, sort: Vec<SortField>) -> Self {
        self.sort = sort;
        self
    }

    /// Adds a single-field full-text match if `text` is non-blank.
    pub fn match_text(mut self, field: &str, text: Option<&str>) -> Self {
        if let Some(text) = non_blank(text) {
            self.clauses.push(Clause::Match {
                field: field.to_string(),
                text: text.to_string(),
            });
        }
        self
    }

    /// Adds a multi-field full-text match if `text` is non-blank.
    pub fn multi_match(mut self, fields: &[&str], text: Option<&str>) -> Self {
        if let Some(text) = non_blank(text) {
            self.clauses.push(Clause::MultiMatch {
                fields: fields.iter().map(|f| f.to_string()).collect(),
                text: text.to_string(),
            });
        }
        self
    }

    /// Adds a numeric range if at least one bound is set.
    pub fn numeric_range(mut self, field: &str, range: NumericRange) -> Self {
        if !range.is_empty() {
            self.clauses.push(Clause::Range {
                field: field.to_string(),
                bounds: RangeBounds::Numeric(range),
            });
        }
        self
    }

    /// Adds a date range if at least one bound is set.
    pub fn date_range(mut self, field: &str, range: DateRange) -> Self {
        if !range.is_empty() {
            self.clauses.push(Clause::Range {
                field: field.to_string(),
                bounds: RangeBounds::Date(range),
            });
        }
        self
    }

    /// Resolves sort fields and produces the request.
    pub fn build(self) -> Result<SearchRequest, ValidationError> {
        let sort = self
            .sort
            .iter()
            .map(|sort_field| {
                Ok(SortClause {
                    field: self.whitelist.resolve(&sort_field.field)?,
                    direction: sort_field.direction,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let must = if self.clauses.is_empty() {
            vec![Clause::MatchAll]
        } else {
            self.clauses
        };

        Ok(SearchRequest {
            must,
            sort,
            from: Some(self.pagination.offset),
            size: self.pagination.limit,
            aggs: Vec::new(),
        })
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
