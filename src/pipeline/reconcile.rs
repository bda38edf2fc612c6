//! Reconciliation of a mapped patch against the stored catalog entry.
//!
//! The payload is built from an explicit allow-list. `status` is not on it:
//! a sync pass writes `status` only when it creates the entry.
//!
//! `additionalCategories` is replaced wholesale on merge, so membership tags
//! another target put on the entry are carried into the patch. Removing them
//! is left to cleanup.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::target::{self, SALE_TAG};
use crate::models::{CanonicalProduct, ProductPatch, ProductStatus};
use crate::storage::{Document, DocumentWrite};

/// Fields a sync pass may write on any entry.
pub const SYNC_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "price",
    "originalPrice",
    "hasDiscount",
    "images",
    "image",
    "category",
    "subCategory",
    "categoryName",
    "subCategoryName",
    "additionalCategories",
    "specifications",
    "brand",
    "targetCode",
    "updatedAt",
    "lastScraped",
    "source",
];

/// Build the merge write for `patch` given what is stored for it, if anything.
pub fn reconcile(patch: ProductPatch, existing: Option<&CanonicalProduct>) -> Result<DocumentWrite> {
    let mut patch = patch;
    if let Some(existing) = existing {
        guard_prices(&mut patch, existing);
        keep_target_tags(&mut patch, existing);
        patch.has_discount = patch.original_price > patch.price
            || patch.target_code == target::codes::SALE
            || patch.additional_categories.iter().any(|t| t == SALE_TAG);
    }

    let id = patch.id.clone();
    let Value::Object(mapped) = serde_json::to_value(&patch)? else {
        return Err(AppError::validation(format!("patch for {id} is not an object")));
    };

    let mut fields: Document = mapped
        .into_iter()
        .filter(|(key, _)| SYNC_FIELDS.contains(&key.as_str()))
        .collect();

    if existing.is_none() {
        fields.insert(
            "status".to_string(),
            Value::String(ProductStatus::Active.as_str().to_string()),
        );
    }

    Ok(DocumentWrite::merge(id, fields))
}

/// A zero from the source never overwrites a stored positive price.
fn guard_prices(patch: &mut ProductPatch, existing: &CanonicalProduct) {
    if patch.price == 0.0 && existing.price > 0.0 {
        log::debug!(
            "Keeping stored price {} for {} over source zero",
            existing.price,
            patch.id
        );
        patch.price = existing.price;
        if patch.original_price == 0.0 && existing.original_price > 0.0 {
            patch.original_price = existing.original_price;
        }
    }
}

/// Append the stored membership tags the patch does not already carry.
fn keep_target_tags(patch: &mut ProductPatch, existing: &CanonicalProduct) {
    for tag in &existing.additional_categories {
        if target::is_target_tag(tag) && !patch.additional_categories.contains(tag) {
            patch.additional_categories.push(tag.clone());
        }
    }
}
