//! Entity records that are mirrored into the search index.
//!
//! Each synchronized entity implements [`SearchEntity`], which ties together
//! its relational shape, its search document projection, its field
//! whitelist and its index mapping.

mod invoice;
mod product;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::search::FieldWhitelist;

pub use invoice::{Invoice, InvoicePatch, InvoiceReport, NewInvoice};
pub use product::{NewProduct, Product, ProductPatch};

/// A relational entity with a search-index projection.
///
/// The search document id is always the primary key rendered in decimal; the
/// index never assigns its own identity.
pub trait SearchEntity:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Insert payload (no primary key, no timestamps).
    type New: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    /// Partial update payload.
    type Patch: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    /// Entity name; also the relational table and the default index name.
    const ENTITY: &'static str;

    /// Returns the primary key.
    fn id(&self) -> i64;

    /// Returns the search document id for this record.
    fn document_id(&self) -> String {
        self.id().to_string()
    }

    /// Projects the record into its search document.
    fn to_document(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Materializes a freshly inserted record.
    fn from_new(id: i64, new: Self::New, now: DateTime<Utc>) -> Self;

    /// Applies a partial update and stamps `updated_at`.
    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    /// Returns the sortable/filterable field whitelist.
    fn whitelist() -> &'static FieldWhitelist;

    /// Returns the index creation body (settings, analyzers and mappings).
    fn index_mapping() -> Value;
}

/// The synchronized entity types, for callers that pick one at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Catalog products.
    Products,
    /// Customer invoices.
    Invoices,
}

impl EntityKind {
    /// Returns the entity name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Products => Product::ENTITY,
            EntityKind::Invoices => Invoice::ENTITY,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "products" | "product" => Ok(EntityKind::Products),
            "invoices" | "invoice" => Ok(EntityKind::Invoices),
            other => Err(format!("unknown entity '{}'", other)),
        }
    }
}
