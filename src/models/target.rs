// src/models/target.rs

//! Sync targets and the tag vocabulary they share.
//!
//! The registry is a fixed table: targets are processed in the order listed
//! here, and each one owns exactly one tag in `additionalCategories`.

use serde::Serialize;

/// Tag applied to sale items.
pub const SALE_TAG: &str = "Sale";
/// Localized twin of [`SALE_TAG`]; always added and removed together with it.
pub const SALE_TAG_LOCALIZED: &str = "Хямдралтай";
/// Tag applied to featured items.
pub const FEATURED_TAG: &str = "Featured";
/// Companion tag of [`FEATURED_TAG`].
pub const TREND_TAG: &str = "Trend";
/// Legacy featured tag still present on older catalog entries.
pub const LEGACY_FEATURED_TAG: &str = "BuyersPick";
/// Tag applied to newly listed items.
pub const NEW_TAG: &str = "New";
/// Tag applied to the distributor's own brand.
pub const HOUSE_BRAND_TAG: &str = "Kirkland Signature";

/// Target codes as the source knows them.
pub mod codes {
    pub const SALE: &str = "SpecialPriceOffers";
    pub const FEATURED: &str = "BuyersPick";
    pub const NEW: &str = "whatsnew";
    pub const HOUSE_BRAND: &str = "ks_all";
}

/// Category label used when a target code is unknown.
pub const GENERAL_CATEGORY: &str = "General";

/// How a target is expressed in the source search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryKind {
    AllCategories,
    Category,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::AllCategories => "allCategories",
            QueryKind::Category => "category",
        }
    }
}

/// A named slice of the source catalog tracked by the sync job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTarget {
    pub code: &'static str,
    pub display_label: &'static str,
    pub query_kind: QueryKind,
    pub tag_name: &'static str,
}

impl SyncTarget {
    /// Search query selecting this target, e.g. `:relevance:allCategories:whatsnew`.
    pub fn search_query(&self) -> String {
        format!(":relevance:{}:{}", self.query_kind.as_str(), self.code)
    }

    pub fn is_sale(&self) -> bool {
        self.code == codes::SALE
    }
}

/// All sync targets in processing order.
pub const TARGETS: [SyncTarget; 4] = [
    SyncTarget {
        code: codes::SALE,
        display_label: "Хямдралтай (Sale)",
        query_kind: QueryKind::AllCategories,
        tag_name: SALE_TAG,
    },
    SyncTarget {
        code: codes::FEATURED,
        display_label: "Онцлох (Featured)",
        query_kind: QueryKind::AllCategories,
        tag_name: FEATURED_TAG,
    },
    SyncTarget {
        code: codes::NEW,
        display_label: "Шинэ (New)",
        query_kind: QueryKind::AllCategories,
        tag_name: NEW_TAG,
    },
    SyncTarget {
        code: codes::HOUSE_BRAND,
        display_label: "Kirkland Signature",
        query_kind: QueryKind::Category,
        tag_name: HOUSE_BRAND_TAG,
    },
];

const CATEGORY_LABELS: &[(&str, &str)] = &[
    (codes::SALE, SALE_TAG),
    (codes::FEATURED, FEATURED_TAG),
    (codes::NEW, NEW_TAG),
    (codes::HOUSE_BRAND, HOUSE_BRAND_TAG),
];

const SUBCATEGORY_LABELS: &[(&str, &str)] = &[
    (codes::SALE, "Special Offers"),
    (codes::FEATURED, "Buyers Pick"),
    (codes::NEW, "New Arrivals"),
    (codes::HOUSE_BRAND, "Everything"),
];

const CATEGORY_DISPLAY_NAMES: &[(&str, &str)] = &[
    (SALE_TAG, SALE_TAG_LOCALIZED),
    (FEATURED_TAG, "Онцлох"),
    (NEW_TAG, "Шинэ"),
    (HOUSE_BRAND_TAG, HOUSE_BRAND_TAG),
];

/// Tags a target always adds to the records it surfaces.
const FORCED_TAGS: &[(&str, &[&str])] = &[
    (codes::SALE, &[SALE_TAG, SALE_TAG_LOCALIZED]),
    (codes::FEATURED, &[TREND_TAG, FEATURED_TAG]),
    (codes::NEW, &[NEW_TAG]),
    (codes::HOUSE_BRAND, &[HOUSE_BRAND_TAG]),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Look up a target by its source code.
pub fn find_target(code: &str) -> Option<&'static SyncTarget> {
    TARGETS.iter().find(|t| t.code == code)
}

/// Top-level category for a target code.
pub fn category_for(code: &str) -> &'static str {
    lookup(CATEGORY_LABELS, code).unwrap_or(GENERAL_CATEGORY)
}

/// Sub-category for a target code.
pub fn subcategory_for(code: &str) -> &'static str {
    lookup(SUBCATEGORY_LABELS, code).unwrap_or(GENERAL_CATEGORY)
}

/// Localized display name for a category; falls back to the category itself.
pub fn category_display_name(category: &str) -> String {
    lookup(CATEGORY_DISPLAY_NAMES, category)
        .unwrap_or(category)
        .to_string()
}

/// Tags always attached to records fetched through `code`. Only the sale
/// target yields the sale tags.
pub fn forced_tags(code: &str) -> &'static [&'static str] {
    FORCED_TAGS
        .iter()
        .find(|(k, _)| *k == code)
        .map(|(_, tags)| *tags)
        .unwrap_or(&[])
}

/// Whether `tag` marks membership in some target rather than describing the
/// record itself.
pub fn is_target_tag(tag: &str) -> bool {
    tag == LEGACY_FEATURED_TAG || FORCED_TAGS.iter().any(|(_, tags)| tags.contains(&tag))
}
