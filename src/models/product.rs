// src/models/product.rs

//! Canonical product shapes: the stored document and the mapper's patch.

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::Document;

/// Lifecycle status of a catalog entry.
///
/// Sync writes `Active` only when creating an entry; every other transition
/// belongs to operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
}

/// Flattened `{name, value}` feature pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub value: String,
}

fn number_or_zero<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64().unwrap_or(0.0))
}

fn tolerant<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// String list that skips non-string entries instead of failing.
fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Read view of a stored catalog entry.
///
/// Stored documents may carry fields written by operators or older jobs, so
/// every field is defaulted and only the ones this engine reasons about are
/// modeled.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProduct {
    #[serde(default)]
    pub id: String,

    #[serde(default, deserialize_with = "tolerant")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "number_or_zero")]
    pub price: f64,

    #[serde(default, deserialize_with = "number_or_zero")]
    pub original_price: f64,

    #[serde(default, deserialize_with = "tolerant")]
    pub has_discount: bool,

    #[serde(default, deserialize_with = "tolerant")]
    pub image: Option<String>,

    #[serde(default, deserialize_with = "tolerant")]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "tolerant")]
    pub brand: Option<String>,

    #[serde(default, deserialize_with = "string_list")]
    pub additional_categories: Vec<String>,

    /// `None` when the stored value is missing or unrecognized
    #[serde(default, deserialize_with = "tolerant")]
    pub status: Option<ProductStatus>,
}

impl CanonicalProduct {
    /// Build a read view from a stored document, keyed by its document id.
    pub fn from_document(id: &str, document: &Document) -> Self {
        let mut product: CanonicalProduct =
            serde_json::from_value(Value::Object(document.clone())).unwrap_or_default();
        product.id = id.to_string();
        product
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.additional_categories.iter().any(|c| c == tag)
    }

    /// Status as operators see it; entries without one count as active.
    pub fn effective_status(&self) -> ProductStatus {
        self.status.unwrap_or_default()
    }
}

/// Output of the field mapper for one source record.
///
/// Deliberately has no `status` field: status is decided by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub original_price: f64,
    pub has_discount: bool,
    pub images: Vec<ProductImage>,
    pub image: String,
    pub category: String,
    pub sub_category: String,
    pub category_name: String,
    pub sub_category_name: String,
    pub additional_categories: Vec<String>,
    pub specifications: Vec<Specification>,
    pub brand: String,
    pub target_code: String,
    pub updated_at: DateTime<Utc>,
    pub last_scraped: DateTime<Utc>,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn read_view_tolerates_foreign_shapes() {
        let doc = json!({
            "price": "n/a",
            "originalPrice": 12000,
            "status": "archived",
            "additionalCategories": ["Sale", 7, "Хямдралтай"],
            "name_mn": "operator field"
        });
        let product = CanonicalProduct::from_document("X1", doc.as_object().unwrap());

        assert_eq!(product.id, "X1");
        assert_eq!(product.price, 0.0);
        assert_eq!(product.original_price, 12000.0);
        assert_eq!(product.status, None);
        assert_eq!(product.effective_status(), ProductStatus::Active);
        assert!(product.has_tag("Sale"));
        assert_eq!(product.additional_categories, ["Sale", "Хямдралтай"]);
    }

    #[test]
    fn status_round_trips_lowercase() {
        let doc = json!({ "status": "inactive" });
        let product = CanonicalProduct::from_document("X2", doc.as_object().unwrap());
        assert_eq!(product.status, Some(ProductStatus::Inactive));
        assert_eq!(ProductStatus::Deleted.as_str(), "deleted");
    }
}
