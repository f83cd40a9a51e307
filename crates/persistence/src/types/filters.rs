//! Typed range filters decoded from request parameters.
//!
//! Both bounds of a range are independently optional. A range with only a
//! lower bound must never grow an upper bound, and vice versa.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Timestamp layout accepted for date bounds (`YYYY-MM-DDTHH:mm:ss`, no zone).
pub const DATE_BOUND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Date format name sent to the search engine alongside date ranges.
pub const ENGINE_DATE_FORMAT: &str = "strict_date_optional_time";

/// A numeric range with independently optional bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    /// Inclusive lower bound.
    pub gte: Option<Decimal>,
    /// Inclusive upper bound.
    pub lte: Option<Decimal>,
}

impl NumericRange {
    /// Parses decimal-string bounds. Blank strings count as absent.
    pub fn parse(
        parameter: &str,
        gte: Option<&str>,
        lte: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            gte: parse_decimal(&format!("{}_gte", parameter), gte)?,
            lte: parse_decimal(&format!("{}_lte", parameter), lte)?,
        })
    }

    /// Returns true if neither bound is set.
    pub fn is_empty(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }

    /// Returns true if `value` lies within the bounds.
    pub fn contains(&self, value: Decimal) -> bool {
        self.gte.is_none_or(|gte| value >= gte) && self.lte.is_none_or(|lte| value <= lte)
    }
}

/// A timestamp range with independently optional bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive lower bound.
    pub gte: Option<NaiveDateTime>,
    /// Inclusive upper bound.
    pub lte: Option<NaiveDateTime>,
}

impl DateRange {
    /// Parses `YYYY-MM-DDTHH:mm:ss` bounds. Blank strings count as absent.
    pub fn parse(
        parameter: &str,
        gte: Option<&str>,
        lte: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            gte: parse_timestamp(&format!("{}_gte", parameter), gte)?,
            lte: parse_timestamp(&format!("{}_lte", parameter), lte)?,
        })
    }

    /// Returns true if neither bound is set.
    pub fn is_empty(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }
}

/// Formats a bound the way the search engine expects it.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(DATE_BOUND_FORMAT).to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_decimal(parameter: &str, value: Option<&str>) -> Result<Option<Decimal>, ValidationError> {
    non_blank(value)
        .map(|raw| {
            raw.parse::<Decimal>()
                .map_err(|e| ValidationError::InvalidFilter {
                    parameter: parameter.to_string(),
                    message: format!("'{}' is not a decimal number: {}", raw, e),
                })
        })
        .transpose()
}

fn parse_timestamp(
    parameter: &str,
    value: Option<&str>,
) -> Result<Option<NaiveDateTime>, ValidationError> {
    non_blank(value)
        .map(|raw| {
            NaiveDateTime::parse_from_str(raw, DATE_BOUND_FORMAT).map_err(|e| {
                ValidationError::InvalidFilter {
                    parameter: parameter.to_string(),
                    message: format!("'{}' is not YYYY-MM-DDTHH:mm:ss: {}", raw, e),
                }
            })
        })
        .transpose()
}
