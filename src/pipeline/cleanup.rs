// src/pipeline/cleanup.rs

//! Stale tag cleanup.
//!
//! After a target's main pass, entries that still carry its tag but were not
//! listed by the source this run lose the tag. Entries are never deleted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::target::{
    FEATURED_TAG, LEGACY_FEATURED_TAG, SALE_TAG, SALE_TAG_LOCALIZED, TREND_TAG,
};
use crate::models::{CanonicalProduct, SyncTarget};
use crate::pipeline::batch::{BatchReport, BatchWriter};
use crate::storage::{CatalogStore, Document, DocumentWrite};

/// Tags removed together with `tag`.
fn companion_tags(tag: &str) -> &'static [&'static str] {
    match tag {
        SALE_TAG => &[SALE_TAG_LOCALIZED],
        FEATURED_TAG => &[TREND_TAG, LEGACY_FEATURED_TAG],
        _ => &[],
    }
}

/// Merge fields that strip `target`'s tag (and its companions) from `product`.
///
/// Every other tag is kept in its original order.
pub fn stale_tag_patch(target: &SyncTarget, product: &CanonicalProduct, now: DateTime<Utc>) -> Document {
    let companions = companion_tags(target.tag_name);
    let remaining: Vec<&str> = product
        .additional_categories
        .iter()
        .map(String::as_str)
        .filter(|tag| *tag != target.tag_name && !companions.contains(tag))
        .collect();

    let mut fields = Document::new();
    fields.insert("additionalCategories".to_string(), json!(remaining));
    if target.tag_name == SALE_TAG {
        fields.insert("hasDiscount".to_string(), Value::Bool(false));
    }
    fields.insert("updatedAt".to_string(), json!(now));
    fields
}

/// Strip `target`'s tag from stored entries missing from `current_ids`.
///
/// Fails only when the tag query itself fails; commit failures are counted
/// in the report.
pub async fn clean_stale_tags(
    store: &dyn CatalogStore,
    target: &SyncTarget,
    current_ids: &HashSet<String>,
    batch_limit: usize,
) -> Result<BatchReport> {
    let tagged = store.find_by_tag(target.tag_name).await?;
    let now = Utc::now();

    let mut writer = BatchWriter::new(store, batch_limit);
    for product in tagged.iter().filter(|p| !current_ids.contains(&p.id)) {
        log::debug!("Removing '{}' from {}", target.tag_name, product.id);
        writer
            .push(DocumentWrite::merge(
                product.id.clone(),
                stale_tag_patch(target, product, now),
            ))
            .await;
    }
    Ok(writer.finish().await)
}
