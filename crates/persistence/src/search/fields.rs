//! Field whitelists.
//!
//! Maps the logical field names clients may sort or filter on to the physical
//! field paths in the index. Free-text fields sort on their `keyword`
//! sub-field, since sorting on an analyzed text field fails in the engine.

use crate::error::ValidationError;

/// Static logical-to-physical field table for one entity.
#[derive(Debug)]
pub struct FieldWhitelist {
    entity: &'static str,
    fields: &'static [(&'static str, &'static str)],
}

impl FieldWhitelist {
    /// Creates a whitelist from `(logical, physical)` pairs.
    pub const fn new(entity: &'static str, fields: &'static [(&'static str, &'static str)]) -> Self {
        Self { entity, fields }
    }

    /// Returns the entity this table belongs to.
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Maps a logical name, or returns `None` if it is not whitelisted.
    pub fn map(&self, logical: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == logical)
            .map(|(_, physical)| *physical)
    }

    /// Maps a logical name, turning an unknown name into a validation error.
    pub fn resolve(&self, logical: &str) -> Result<&'static str, ValidationError> {
        self.map(logical).ok_or_else(|| ValidationError::UnknownField {
            entity: self.entity.to_string(),
            field: logical.to_string(),
        })
    }

    /// Returns every accepted logical name.
    pub fn logical_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }
}

/// Product fields.
pub static PRODUCT_FIELDS: FieldWhitelist = FieldWhitelist::new(
    "products",
    &[
        ("id", "id"),
        ("name", "name.keyword"),
        ("description", "description.keyword"),
        ("price", "price"),
        ("discount_percentage", "discount_percentage"),
        ("stock", "stock"),
        ("image_url", "image_url"),
        ("category_id", "category_id"),
        ("created_at", "created_at"),
        ("updated_at", "updated_at"),
    ],
);

/// Invoice fields.
pub static INVOICE_FIELDS: FieldWhitelist = FieldWhitelist::new(
    "invoices",
    &[
        ("id", "id"),
        ("user_id", "user_id"),
        ("total_amount", "total_amount"),
        ("status", "status"),
        ("created_at", "created_at"),
        ("updated_at", "updated_at"),
    ],
);
