//! Entity services: validated CRUD with index sync, search and reindexing.
//!
//! Services are the trigger points of the sync engine. Each one owns a
//! [`DualWriteCoordinator`](crate::sync::DualWriteCoordinator) for its entity
//! and reads exclusively from the search index; the relational store is only
//! read directly to fetch a single record by id.

mod catalog;
mod invoices;

pub use catalog::{CatalogService, DEFAULT_PRODUCT_SORT, PRODUCT_TEXT_FIELDS, ProductSearchParams};
pub use invoices::{
    DEFAULT_INVOICE_SORT, InvoiceAggregationParams, InvoiceSearchParams, InvoiceService,
    TOTAL_AMOUNT_AVG, TOTAL_AMOUNT_SUM,
};

use crate::error::ValidationError;

pub(crate) fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}
