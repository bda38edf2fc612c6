//! In-memory storage backend.
//!
//! Keeps everything in process and records what the engine did to it:
//! the size of every commit and every published progress snapshot.
//! Unit tests can also make commits and reads fail.

use std::collections::{BTreeMap, HashMap};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

#[cfg(test)]
use crate::error::AppError;
use crate::error::Result;
use crate::models::{CanonicalProduct, JobLease, ScraperCredentials, SyncProgress};
use crate::storage::{
    CatalogStore, Document, DocumentWrite, check_commit_size, decode_lease, merge_document, paths,
};

#[derive(Default)]
pub struct MemoryStorage {
    products: Mutex<BTreeMap<String, Document>>,
    documents: Mutex<BTreeMap<String, Value>>,
    commit_sizes: Mutex<Vec<usize>>,
    progress_history: Mutex<Vec<SyncProgress>>,
    #[cfg(test)]
    failing_commits: AtomicUsize,
    #[cfg(test)]
    failing_reads: AtomicBool,
    #[cfg(test)]
    failing_credentials: AtomicBool,
    #[cfg(test)]
    failing_progress: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite one catalog entry. Non-object values are ignored.
    pub async fn insert_product(&self, id: &str, document: Value) {
        if let Value::Object(document) = document {
            self.products.lock().await.insert(id.to_string(), document);
        }
    }

    pub async fn product(&self, id: &str) -> Option<Document> {
        self.products.lock().await.get(id).cloned()
    }

    pub async fn product_count(&self) -> usize {
        self.products.lock().await.len()
    }

    pub async fn document(&self, path: &str) -> Option<Value> {
        self.documents.lock().await.get(path).cloned()
    }

    pub async fn set_credentials(&self, credentials: &ScraperCredentials) -> Result<()> {
        let value = serde_json::to_value(credentials)?;
        self.documents
            .lock()
            .await
            .insert(paths::CREDENTIALS.to_string(), value);
        Ok(())
    }

    /// Sizes of successfully applied commits, in order.
    pub async fn commit_sizes(&self) -> Vec<usize> {
        self.commit_sizes.lock().await.clone()
    }

    /// Every progress snapshot that was published, in order.
    pub async fn progress_history(&self) -> Vec<SyncProgress> {
        self.progress_history.lock().await.clone()
    }

    /// Stored lease for `job`; an undecodable one reads as absent.
    fn lease_at(documents: &BTreeMap<String, Value>, job: &str) -> Option<JobLease> {
        let value = documents.get(&paths::lease(job))?.clone();
        decode_lease(job, serde_json::from_value(value))
    }
}

#[cfg(test)]
impl MemoryStorage {
    /// Fail the next `count` commits without applying them.
    pub(crate) fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Fail every catalog read until switched off.
    pub(crate) fn fail_reads(&self, fail: bool) {
        self.failing_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_credentials(&self, fail: bool) {
        self.failing_credentials.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_progress(&self, fail: bool) {
        self.failing_progress.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<()> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(AppError::store("catalog unavailable"));
        }
        Ok(())
    }

    fn take_commit_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl CatalogStore for MemoryStorage {
    async fn get_products(&self, ids: &[String]) -> Result<HashMap<String, CanonicalProduct>> {
        #[cfg(test)]
        self.check_reads()?;
        let products = self.products.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                products
                    .get(id)
                    .map(|doc| (id.clone(), CanonicalProduct::from_document(id, doc)))
            })
            .collect())
    }

    async fn list_products(&self) -> Result<Vec<CanonicalProduct>> {
        #[cfg(test)]
        self.check_reads()?;
        let products = self.products.lock().await;
        Ok(products
            .iter()
            .map(|(id, doc)| CanonicalProduct::from_document(id, doc))
            .collect())
    }

    async fn commit(&self, writes: &[DocumentWrite]) -> Result<()> {
        check_commit_size(writes)?;
        #[cfg(test)]
        if self.take_commit_failure() {
            return Err(AppError::store("injected commit failure"));
        }

        let mut products = self.products.lock().await;
        for write in writes {
            let entry = products.entry(write.id.clone()).or_default();
            merge_document(entry, &write.fields);
        }
        self.commit_sizes.lock().await.push(writes.len());
        Ok(())
    }

    async fn read_document(&self, path: &str) -> Result<Option<Value>> {
        #[cfg(test)]
        if path == paths::CREDENTIALS && self.failing_credentials.load(Ordering::SeqCst) {
            return Err(AppError::store("credentials unavailable"));
        }
        Ok(self.documents.lock().await.get(path).cloned())
    }

    async fn write_documents(&self, documents: &[(String, Value)]) -> Result<()> {
        let mut stored = self.documents.lock().await;
        for (path, value) in documents {
            stored.insert(path.clone(), value.clone());
        }
        Ok(())
    }

    async fn try_acquire_lease(&self, lease: &JobLease) -> Result<Option<JobLease>> {
        let mut documents = self.documents.lock().await;

        if let Some(current) = Self::lease_at(&documents, &lease.job) {
            if !current.yields_to(lease) {
                return Ok(Some(current));
            }
        }

        documents.insert(paths::lease(&lease.job), serde_json::to_value(lease)?);
        Ok(None)
    }

    async fn release_lease(&self, job: &str, holder: &str) -> Result<()> {
        let mut documents = self.documents.lock().await;

        let held_by_caller = Self::lease_at(&documents, job).is_some_and(|l| l.holder == holder);
        if held_by_caller {
            documents.remove(&paths::lease(job));
        }
        Ok(())
    }

    async fn save_progress(&self, progress: &SyncProgress) -> Result<()> {
        #[cfg(test)]
        if self.failing_progress.load(Ordering::SeqCst) {
            return Err(AppError::store("progress document unavailable"));
        }
        let value = serde_json::to_value(progress)?;
        self.write_documents(&[(paths::PROGRESS.to_string(), value)])
            .await?;
        self.progress_history.lock().await.push(progress.clone());
        Ok(())
    }
}
