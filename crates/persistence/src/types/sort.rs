//! Sort specification parsing.
//!
//! A sort specification is a comma-separated list of `field` or
//! `field:direction` tokens, e.g. `created_at:desc,id`. Order is significant:
//! earlier fields take precedence, later ones break ties.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Returns the wire name used by the search engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Parses a direction suffix. Only `desc` (any case) is descending.
    pub fn from_suffix(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single logical sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Logical field name, not yet checked against any whitelist.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortField {
    /// Creates a sort field.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Creates an ascending sort field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Creates a descending sort field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.direction)
    }
}

/// Parses a `sort_by` string into an ordered list of sort fields.
///
/// Never fails. Empty tokens are skipped and unknown field names pass
/// through unchanged; checking them is the caller's job.
pub fn parse_sort_by(sort_by: &str) -> Vec<SortField> {
    sort_by
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let (field, direction) = match token.split_once(':') {
                Some((field, suffix)) => (field.trim(), SortDirection::from_suffix(suffix)),
                None => (token, SortDirection::Asc),
            };
            if field.is_empty() {
                None
            } else {
                Some(SortField::new(field, direction))
            }
        })
        .collect()
}

/// Renders sort fields back into `sort_by` form.
pub fn format_sort_by(fields: &[SortField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
