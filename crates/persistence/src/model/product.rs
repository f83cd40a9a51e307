//! Catalog product records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::search::{FieldWhitelist, PRODUCT_FIELDS};

use super::SearchEntity;

/// A catalog product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Unit price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Discount in whole percent.
    pub discount_percentage: i32,
    /// Units in stock.
    pub stock: i32,
    /// Product image location.
    pub image_url: String,
    /// Owning category.
    pub category_id: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Unit price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Discount in whole percent.
    #[serde(default)]
    pub discount_percentage: i32,
    /// Units in stock.
    #[serde(default)]
    pub stock: i32,
    /// Product image location.
    #[serde(default)]
    pub image_url: String,
    /// Owning category.
    pub category_id: i64,
}

/// Partial update of a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New price.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    /// New discount, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<i32>,
    /// New units in stock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
    /// New image location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// New owning category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

impl SearchEntity for Product {
    type New = NewProduct;
    type Patch = ProductPatch;

    const ENTITY: &'static str = "products";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_new(id: i64, new: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            price: new.price,
            discount_percentage: new.discount_percentage,
            stock: new.stock,
            image_url: new.image_url,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: ProductPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(discount) = patch.discount_percentage {
            self.discount_percentage = discount;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        self.updated_at = now;
    }

    fn whitelist() -> &'static FieldWhitelist {
        &PRODUCT_FIELDS
    }

    /// Product index body.
    ///
    /// `price.as_text` is analyzed with an edge-n-gram tokenizer over digits so
    /// that free-text search can match price prefixes ("25" finds 250000).
    fn index_mapping() -> Value {
        json!({
            "settings": {
                "analysis": {
                    "analyzer": {
                        "ngram_analyzer": {
                            "type": "custom",
                            "tokenizer": "ngram_tokenizer",
                            "filter": ["lowercase"]
                        }
                    },
                    "tokenizer": {
                        "ngram_tokenizer": {
                            "type": "edge_ngram",
                            "min_gram": 1,
                            "max_gram": 10,
                            "token_chars": ["digit"]
                        }
                    }
                }
            },
            "mappings": {
                "properties": {
                    "id": { "type": "long" },
                    "name": {
                        "type": "text",
                        "analyzer": "standard",
                        "fields": {
                            "keyword": { "type": "keyword" }
                        }
                    },
                    "description": {
                        "type": "text",
                        "analyzer": "standard",
                        "fields": {
                            "keyword": { "type": "keyword", "ignore_above": 256 }
                        }
                    },
                    "price": {
                        "type": "double",
                        "fields": {
                            "as_text": {
                                "type": "text",
                                "analyzer": "ngram_analyzer",
                                "search_analyzer": "standard"
                            }
                        }
                    },
                    "discount_percentage": { "type": "integer" },
                    "stock": { "type": "integer" },
                    "image_url": { "type": "keyword" },
                    "category_id": { "type": "long" },
                    "created_at": { "type": "date" },
                    "updated_at": { "type": "date" }
                }
            }
        })
    }
}
