//! Local filesystem storage implementation.
//!
//! Used for development, the CLI, and tests. Every write goes through a
//! temp file and a rename, so one commit replaces the catalog atomically.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── catalog.json          # { "<id>": { ...document } }
//! ├── settings/
//! │   └── scraper.json      # Source credentials
//! └── system/
//!     ├── syncStatus.json   # Progress document
//!     ├── lease_{job}.json  # Job leases
//!     └── search_index_*.json
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{CanonicalProduct, JobLease};
use crate::storage::{
    CatalogStore, Document, DocumentWrite, check_commit_size, decode_lease, merge_document, paths,
};

const CATALOG_KEY: &str = "catalog.json";

type Catalog = BTreeMap<String, Document>;

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    /// Serializes read-modify-write cycles on the catalog and leases
    write_lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Key of a system document path such as `system/syncStatus`.
    fn document_key(path: &str) -> Result<String> {
        let valid = !path.is_empty()
            && path
                .split('/')
                .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
        if !valid {
            return Err(AppError::store(format!("invalid document path: {path:?}")));
        }
        Ok(format!("{path}.json"))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_catalog(&self) -> Result<Catalog> {
        Ok(self.read_json(CATALOG_KEY).await?.unwrap_or_default())
    }

    /// Raw stored document for one entry.
    pub async fn product_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.load_catalog().await?.remove(id))
    }

    /// Overwrite one catalog entry. Used to seed fixtures and by operators.
    pub async fn put_product(&self, id: &str, document: Document) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut catalog = self.load_catalog().await?;
        catalog.insert(id.to_string(), document);
        self.write_json(CATALOG_KEY, &catalog).await
    }

    /// Stored lease for `job`; an undecodable one reads as absent.
    async fn read_lease(&self, job: &str, key: &str) -> Result<Option<JobLease>> {
        Ok(self
            .read_bytes(key)
            .await?
            .and_then(|bytes| decode_lease(job, serde_json::from_slice(&bytes))))
    }
}

#[async_trait]
impl CatalogStore for LocalStorage {
    async fn get_products(&self, ids: &[String]) -> Result<HashMap<String, CanonicalProduct>> {
        let catalog = self.load_catalog().await?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                catalog
                    .get(id)
                    .map(|doc| (id.clone(), CanonicalProduct::from_document(id, doc)))
            })
            .collect())
    }

    async fn list_products(&self) -> Result<Vec<CanonicalProduct>> {
        let catalog = self.load_catalog().await?;
        Ok(catalog
            .iter()
            .map(|(id, doc)| CanonicalProduct::from_document(id, doc))
            .collect())
    }

    async fn commit(&self, writes: &[DocumentWrite]) -> Result<()> {
        check_commit_size(writes)?;
        if writes.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let mut catalog = self.load_catalog().await?;
        for write in writes {
            let entry = catalog.entry(write.id.clone()).or_default();
            merge_document(entry, &write.fields);
        }
        self.write_json(CATALOG_KEY, &catalog).await?;
        log::debug!("Committed {} writes to {}", writes.len(), CATALOG_KEY);
        Ok(())
    }

    async fn read_document(&self, path: &str) -> Result<Option<Value>> {
        self.read_json(&Self::document_key(path)?).await
    }

    async fn write_documents(&self, documents: &[(String, Value)]) -> Result<()> {
        let keys = documents
            .iter()
            .map(|(path, _)| Self::document_key(path))
            .collect::<Result<Vec<_>>>()?;

        let _guard = self.write_lock.lock().await;
        for (key, (_, value)) in keys.iter().zip(documents) {
            self.write_json(key, value).await?;
        }
        Ok(())
    }

    async fn try_acquire_lease(&self, lease: &JobLease) -> Result<Option<JobLease>> {
        let key = Self::document_key(&paths::lease(&lease.job))?;
        let _guard = self.write_lock.lock().await;

        if let Some(current) = self.read_lease(&lease.job, &key).await? {
            if !current.yields_to(lease) {
                return Ok(Some(current));
            }
            if current.is_expired(Utc::now()) {
                log::warn!(
                    "Taking over expired lease on {} from {}",
                    current.job,
                    current.holder
                );
            }
        }

        self.write_json(&key, lease).await?;
        Ok(None)
    }

    async fn release_lease(&self, job: &str, holder: &str) -> Result<()> {
        let key = Self::document_key(&paths::lease(job))?;
        let _guard = self.write_lock.lock().await;

        match self.read_lease(job, &key).await? {
            Some(current) if current.holder == holder => {
                tokio::fs::remove_file(self.path(&key)).await?;
                Ok(())
            }
            Some(current) => {
                log::warn!(
                    "Lease on {} is held by {}, not releasing for {}",
                    job,
                    current.holder,
                    holder
                );
                Ok(())
            }
            None => Ok(()),
        }
    }
}
