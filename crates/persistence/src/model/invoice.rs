//! Customer invoice records and invoice aggregation reports.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::search::{FieldWhitelist, INVOICE_FIELDS};

use super::SearchEntity;

/// An invoice row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Primary key.
    pub id: i64,
    /// Billed customer.
    pub user_id: i64,
    /// Invoice total.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    /// Free-form lifecycle status (e.g. `PENDING`, `PAID`).
    pub status: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    /// Billed customer.
    pub user_id: i64,
    /// Invoice total.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    /// Initial status.
    pub status: String,
}

/// Partial update of an invoice. Only the status is mutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoicePatch {
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Sum and average of `total_amount` over a time window.
///
/// `start_time`/`end_time` echo the window bounds that were supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceReport {
    /// Inclusive lower bound of the window, if one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,
    /// Inclusive upper bound of the window, if one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveDateTime>,
    /// Sum of `total_amount`.
    pub sum: f64,
    /// Mean of `total_amount`; zero when the window is empty.
    pub avg: f64,
}

impl SearchEntity for Invoice {
    type New = NewInvoice;
    type Patch = InvoicePatch;

    const ENTITY: &'static str = "invoices";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_new(id: i64, new: NewInvoice, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            total_amount: new.total_amount,
            status: new.status,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: InvoicePatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
    }

    fn whitelist() -> &'static FieldWhitelist {
        &INVOICE_FIELDS
    }

    fn index_mapping() -> Value {
        json!({
            "mappings": {
                "properties": {
                    "id": { "type": "long" },
                    "user_id": { "type": "long" },
                    "total_amount": { "type": "double" },
                    "status": { "type": "keyword" },
                    "created_at": { "type": "date" },
                    "updated_at": { "type": "date" }
                }
            }
        })
    }
}
