// src/pipeline/map.rs

//! Field mapping: raw source record to canonical product patch.
//!
//! Mapping is pure. It never looks at the stored catalog and never decides
//! `status`; that belongs to reconciliation.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::Result;
use crate::models::target::{
    self, category_display_name, category_for, forced_tags, subcategory_for,
};
use crate::models::{Config, ProductImage, ProductPatch, RawClassification, RawRecord, Specification};
use crate::utils::absolutize;

/// Image format marking the main product shot.
const PRIMARY_IMAGE_FORMAT: &str = "product";

/// Maps raw records into canonical patches for one run.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    base: Url,
    default_brand: String,
    source_name: String,
}

impl FieldMapper {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            base: config.source.base()?,
            default_brand: config.source.default_brand.clone(),
            source_name: config.sync.source_name.clone(),
        })
    }

    /// Map `raw`, fetched through `target_code`, stamped with `now`.
    pub fn map_record(&self, raw: &RawRecord, target_code: &str, now: DateTime<Utc>) -> ProductPatch {
        let price = raw.price_value();
        let original_price = raw.base_price_value();
        let has_discount = original_price > price || target_code == target::codes::SALE;

        let images: Vec<ProductImage> = raw
            .images
            .iter()
            .filter_map(|img| {
                let url = absolutize(&self.base, img.url.as_deref()?);
                (!url.is_empty()).then(|| ProductImage {
                    url,
                    format: img.format.clone(),
                    image_type: img.image_type.clone(),
                })
            })
            .collect();
        let image = images
            .iter()
            .find(|img| img.format.as_deref() == Some(PRIMARY_IMAGE_FORMAT))
            .or_else(|| images.first())
            .map(|img| img.url.clone())
            .unwrap_or_default();

        let category = category_for(target_code);
        let sub_category = subcategory_for(target_code);
        let category_name = category_display_name(category);

        let mut tags = Vec::new();
        let base_tags = [
            Some(category),
            Some(sub_category),
            Some(category_name.as_str()),
            raw.ancillary_group_id.as_deref(),
        ];
        for tag in base_tags.into_iter().flatten() {
            push_unique(&mut tags, tag);
        }
        for tag in forced_tags(target_code) {
            push_unique(&mut tags, tag);
        }

        let brand = raw
            .manufacturer
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_brand)
            .to_string();

        ProductPatch {
            id: raw.id().to_string(),
            name: raw.name.clone(),
            description: raw.description.clone(),
            price,
            original_price,
            has_discount,
            images,
            image,
            category: category.to_string(),
            sub_category: sub_category.to_string(),
            category_name,
            sub_category_name: sub_category.to_string(),
            additional_categories: tags,
            specifications: flatten_specifications(&raw.classifications),
            brand,
            target_code: target_code.to_string(),
            updated_at: now,
            last_scraped: now,
            source: self.source_name.clone(),
        }
    }
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    let tag = tag.trim();
    if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

/// First value of every named feature, across all classifications.
fn flatten_specifications(classifications: &[RawClassification]) -> Vec<Specification> {
    classifications
        .iter()
        .flat_map(|c| &c.features)
        .filter_map(|feature| {
            let name = feature.name.as_deref().filter(|n| !n.is_empty())?;
            let first = feature.feature_values.first()?;
            Some(Specification {
                name: name.to_string(),
                value: first.value.clone().unwrap_or_default(),
            })
        })
        .collect()
}
