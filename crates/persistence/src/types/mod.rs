//! Core types shared by the query builders, sync coordinator and reindexer.

mod filters;
mod pagination;
mod sort;

pub use filters::{
    DATE_BOUND_FORMAT, DateRange, ENGINE_DATE_FORMAT, NumericRange, format_timestamp,
};
pub use pagination::{DEFAULT_LIMIT, MAX_LIMIT, Pagination};
pub use sort::{SortDirection, SortField, format_sort_by, parse_sort_by};
