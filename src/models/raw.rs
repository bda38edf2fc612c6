// src/models/raw.rs

//! Schema for the subset of source payloads the engine reads.
//!
//! Every field is optional and lenient: a field that is absent, `null`, or of
//! an unexpected shape deserializes to its documented default instead of
//! failing the whole record.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Deserialize a field, mapping any shape mismatch to `None`.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Deserialize an identifier that may arrive as a string or a number.
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    Ok(id.filter(|s| !s.is_empty()))
}

fn lenient_vec<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Nested price object; only `value` is used.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPrice {
    /// Numeric price; absent means 0
    #[serde(default, deserialize_with = "lenient")]
    pub value: Option<f64>,
}

/// One entry of the source image list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImage {
    /// Absolute or origin-relative URL
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,

    /// `"product"` marks the main product shot
    #[serde(default, deserialize_with = "lenient")]
    pub format: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub image_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFeatureValue {
    #[serde(default, deserialize_with = "lenient")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFeature {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_vec")]
    pub feature_values: Vec<RawFeatureValue>,
}

/// Classification group holding product features.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawClassification {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub features: Vec<RawFeature>,
}

/// Full product record from the detail endpoint.
///
/// A record without `code` is unusable and treated as "no record".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Stable source identifier
    #[serde(default, deserialize_with = "lenient_id")]
    pub code: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,

    /// Selling price; default 0
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<RawPrice>,

    /// Pre-discount price; defaults to the selling price
    #[serde(default, deserialize_with = "lenient")]
    pub base_price: Option<RawPrice>,

    #[serde(default, deserialize_with = "lenient_vec")]
    pub images: Vec<RawImage>,

    #[serde(default, deserialize_with = "lenient_vec")]
    pub classifications: Vec<RawClassification>,

    /// Brand; defaults to the distributor's name
    #[serde(default, deserialize_with = "lenient")]
    pub manufacturer: Option<String>,

    /// Ancillary group id, copied into the category tags when present
    #[serde(rename = "wcs_ag_id", default, deserialize_with = "lenient_id")]
    pub ancillary_group_id: Option<String>,
}

impl RawRecord {
    /// Parse a detail response; `None` when it carries no identifier.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let record: RawRecord = serde_json::from_value(value).ok()?;
        record.code.is_some().then_some(record)
    }

    pub fn id(&self) -> &str {
        self.code.as_deref().unwrap_or_default()
    }

    /// Selling price, 0 when absent.
    pub fn price_value(&self) -> f64 {
        self.price
            .as_ref()
            .and_then(|p| p.value)
            .unwrap_or(0.0)
    }

    /// Base price, falling back to the selling price when absent.
    pub fn base_price_value(&self) -> f64 {
        self.base_price
            .as_ref()
            .and_then(|p| p.value)
            .unwrap_or_else(|| self.price_value())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(default, deserialize_with = "lenient_id")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default, deserialize_with = "lenient")]
    pub total_pages: Option<usize>,
}

/// One page of the search endpoint.
///
/// `products` is `None` when the response is missing or malformed, which ends
/// pagination for the target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default, deserialize_with = "lenient")]
    pub products: Option<Vec<SearchHit>>,

    #[serde(default, deserialize_with = "lenient")]
    pub pagination: Option<Pagination>,
}

impl SearchPage {
    /// Parse a search response; `None` when it is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Identifiers on this page, skipping hits without a code.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.products
            .iter()
            .flatten()
            .filter_map(|hit| hit.code.as_deref())
    }

    pub fn total_pages(&self) -> Option<usize> {
        self.pagination.as_ref().and_then(|p| p.total_pages)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn price_defaults() {
        let record = RawRecord::from_value(json!({ "code": "X1" })).unwrap();
        assert_eq!(record.price_value(), 0.0);
        assert_eq!(record.base_price_value(), 0.0);

        let record =
            RawRecord::from_value(json!({ "code": "X1", "price": { "value": 10000 } })).unwrap();
        assert_eq!(record.price_value(), 10000.0);
        assert_eq!(record.base_price_value(), 10000.0);
    }

    #[test]
    fn malformed_fields_fall_back_instead_of_failing() {
        let record = RawRecord::from_value(json!({
            "code": 1234567,
            "price": "free",
            "images": { "not": "a list" },
            "manufacturer": 42,
            "wcs_ag_id": 77
        }))
        .unwrap();

        assert_eq!(record.id(), "1234567");
        assert_eq!(record.price_value(), 0.0);
        assert!(record.images.is_empty());
        assert!(record.manufacturer.is_none());
        assert_eq!(record.ancillary_group_id.as_deref(), Some("77"));
    }

    #[test]
    fn record_without_code_is_rejected() {
        assert!(RawRecord::from_value(json!({ "name": "nameless" })).is_none());
        assert!(RawRecord::from_value(json!({ "code": "" })).is_none());
        assert!(RawRecord::from_value(json!([1, 2, 3])).is_none());
    }

    #[test]
    fn search_page_shapes() {
        let page: SearchPage = serde_json::from_value(json!({
            "products": [{ "code": "A" }, { "code": null }, { "code": "B" }],
            "pagination": { "totalPages": 3 }
        }))
        .unwrap();
        assert_eq!(page.codes().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(page.total_pages(), Some(3));

        let empty = SearchPage::from_value(json!({ "error": "nope" })).unwrap();
        assert!(empty.products.is_none());
        assert!(SearchPage::from_value(json!("oops")).is_none());
    }
}
