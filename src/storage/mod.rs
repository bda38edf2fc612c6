//! Storage abstractions for the product catalog and system documents.
//!
//! The catalog is a collection of schemaless JSON documents keyed by the
//! stable source identifier. The engine only ever merges into documents;
//! it never replaces or deletes them.
//!
//! ## Document Layout
//!
//! ```text
//! products/{id}              # Catalog entries
//! settings/scraper           # Source credentials (read-only here)
//! system/syncStatus          # Progress document (overwritten in place)
//! system/lease_{job}         # Job leases
//! system/search_index_{n}    # Search index chunks
//! system/search_index_meta   # Search index metadata
//! ```

pub mod local;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{CanonicalProduct, JobLease, ProductStatus, ScraperCredentials, SyncProgress};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Hard ceiling on writes per commit, enforced by every backend.
pub const STORE_COMMIT_LIMIT: usize = 500;

/// Well-known system document paths.
pub mod paths {
    pub const CREDENTIALS: &str = "settings/scraper";
    pub const PROGRESS: &str = "system/syncStatus";
    pub const SEARCH_INDEX_META: &str = "system/search_index_meta";

    pub fn lease(job: &str) -> String {
        format!("system/lease_{job}")
    }

    pub fn search_index_chunk(index: usize) -> String {
        format!("system/search_index_{index}")
    }
}

/// A merge write against one catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    pub id: String,
    pub fields: Document,
}

impl DocumentWrite {
    pub fn merge(id: impl Into<String>, fields: Document) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Merge `patch` into `target`: nested objects merge recursively, every
/// other value replaces what was stored. Keys absent from `patch` are kept.
pub fn merge_document(target: &mut Document, patch: &Document) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_document(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Decode a stored lease. A lease that does not decode is logged and
/// treated as absent.
pub fn decode_lease(job: &str, decoded: serde_json::Result<JobLease>) -> Option<JobLease> {
    match decoded {
        Ok(lease) => Some(lease),
        Err(e) => {
            log::warn!("Ignoring unreadable lease on {}: {}", job, e);
            None
        }
    }
}

/// Reject commits the store would refuse.
pub fn check_commit_size(writes: &[DocumentWrite]) -> Result<()> {
    if writes.len() > STORE_COMMIT_LIMIT {
        return Err(AppError::store(format!(
            "commit of {} writes exceeds the limit of {}",
            writes.len(),
            STORE_COMMIT_LIMIT
        )));
    }
    Ok(())
}

/// Trait for catalog storage backends.
///
/// Backends implement the primitives; tag, price, and system-document
/// helpers have default implementations on top of them.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch the entries that exist among `ids`.
    async fn get_products(&self, ids: &[String]) -> Result<HashMap<String, CanonicalProduct>>;

    /// Every catalog entry.
    async fn list_products(&self) -> Result<Vec<CanonicalProduct>>;

    /// Apply merge writes as one atomic unit. Fails without applying anything
    /// when more than [`STORE_COMMIT_LIMIT`] writes are given.
    async fn commit(&self, writes: &[DocumentWrite]) -> Result<()>;

    /// Read a system document.
    async fn read_document(&self, path: &str) -> Result<Option<Value>>;

    /// Overwrite system documents in the order given.
    ///
    /// Every path is validated before anything is written. Callers put the
    /// document readers key off (such as an index's metadata) last, so a
    /// write cut short never publishes it ahead of what it describes.
    async fn write_documents(&self, documents: &[(String, Value)]) -> Result<()>;

    /// Store `lease` unless a live lease held by someone else exists.
    ///
    /// Returns the blocking lease when acquisition fails.
    async fn try_acquire_lease(&self, lease: &JobLease) -> Result<Option<JobLease>>;

    /// Drop the lease for `job` if `holder` still owns it.
    async fn release_lease(&self, job: &str, holder: &str) -> Result<()>;

    /// Entries whose `additionalCategories` contains `tag`.
    async fn find_by_tag(&self, tag: &str) -> Result<Vec<CanonicalProduct>> {
        Ok(self
            .list_products()
            .await?
            .into_iter()
            .filter(|p| p.has_tag(tag))
            .collect())
    }

    async fn count_by_tag(&self, tag: &str) -> Result<usize> {
        Ok(self.find_by_tag(tag).await?.len())
    }

    /// Up to `limit` entries with `price == 0` and `status == active`.
    async fn find_zero_price_active(&self, limit: usize) -> Result<Vec<CanonicalProduct>> {
        Ok(self
            .list_products()
            .await?
            .into_iter()
            .filter(|p| p.price == 0.0 && p.status == Some(ProductStatus::Active))
            .take(limit)
            .collect())
    }

    /// Scraper credentials, if configured.
    async fn load_credentials(&self) -> Result<Option<ScraperCredentials>> {
        match self.read_document(paths::CREDENTIALS).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save_progress(&self, progress: &SyncProgress) -> Result<()> {
        let value = serde_json::to_value(progress)?;
        self.write_documents(&[(paths::PROGRESS.to_string(), value)])
            .await
    }

    async fn load_progress(&self) -> Result<Option<SyncProgress>> {
        match self.read_document(paths::PROGRESS).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let mut stored = doc(json!({ "name": "Widget", "status": "inactive", "price": 100 }));
        merge_document(&mut stored, &doc(json!({ "price": 120, "hasDiscount": false })));

        assert_eq!(stored["name"], "Widget");
        assert_eq!(stored["status"], "inactive");
        assert_eq!(stored["price"], 120);
        assert_eq!(stored["hasDiscount"], false);
    }

    #[test]
    fn merge_recurses_into_objects_and_replaces_arrays() {
        let mut stored = doc(json!({
            "meta": { "a": 1, "b": 2 },
            "additionalCategories": ["Sale", "New"]
        }));
        merge_document(
            &mut stored,
            &doc(json!({ "meta": { "b": 3 }, "additionalCategories": ["New"] })),
        );

        assert_eq!(stored["meta"], json!({ "a": 1, "b": 3 }));
        assert_eq!(stored["additionalCategories"], json!(["New"]));
    }

    #[test]
    fn commit_size_is_capped() {
        let writes: Vec<_> = (0..=STORE_COMMIT_LIMIT)
            .map(|i| DocumentWrite::merge(i.to_string(), Document::new()))
            .collect();
        assert!(check_commit_size(&writes).is_err());
        assert!(check_commit_size(&writes[..STORE_COMMIT_LIMIT]).is_ok());
    }
}
