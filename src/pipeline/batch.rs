//! Size-bounded batch commits.

use crate::storage::{CatalogStore, DocumentWrite, STORE_COMMIT_LIMIT};

/// Outcome of the commits a writer has issued so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Writes in chunks the store accepted
    pub committed: usize,
    /// Writes in chunks the store rejected
    pub failed: usize,
    /// Chunk commits attempted
    pub chunks: usize,
}

/// Accumulates merge writes and commits them in chunks of at most `limit`.
///
/// Chunks are independent: a failed chunk is logged and counted, and later
/// chunks still go out. Nothing already committed is rolled back.
pub struct BatchWriter<'a> {
    store: &'a dyn CatalogStore,
    limit: usize,
    pending: Vec<DocumentWrite>,
    report: BatchReport,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn CatalogStore, limit: usize) -> Self {
        let limit = limit.clamp(1, STORE_COMMIT_LIMIT);
        Self {
            store,
            limit,
            pending: Vec::with_capacity(limit),
            report: BatchReport::default(),
        }
    }

    /// Queue one write, committing once a full chunk is pending.
    pub async fn push(&mut self, write: DocumentWrite) {
        self.pending.push(write);
        if self.pending.len() >= self.limit {
            self.flush().await;
        }
    }

    /// Commit everything pending.
    pub async fn flush(&mut self) {
        while !self.pending.is_empty() {
            let take = self.pending.len().min(self.limit);
            let chunk: Vec<DocumentWrite> = self.pending.drain(..take).collect();
            self.report.chunks += 1;

            match self.store.commit(&chunk).await {
                Ok(()) => self.report.committed += chunk.len(),
                Err(e) => {
                    log::error!("Batch commit of {} writes failed: {}", chunk.len(), e);
                    self.report.failed += chunk.len();
                }
            }
        }
    }

    /// Flush and return the final report.
    pub async fn finish(mut self) -> BatchReport {
        self.flush().await;
        self.report
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    fn write(i: usize) -> DocumentWrite {
        DocumentWrite::merge(
            format!("P{i}"),
            json!({ "price": i }).as_object().cloned().unwrap(),
        )
    }

    #[tokio::test]
    async fn chunks_never_exceed_limit() {
        let store = MemoryStorage::new();
        let mut writer = BatchWriter::new(&store, 400);
        for i in 0..1001 {
            writer.push(write(i)).await;
        }
        let report = writer.finish().await;

        assert_eq!(store.commit_sizes().await, vec![400, 400, 201]);
        assert_eq!(report.committed, 1001);
        assert_eq!(report.chunks, 3);
    }

    #[tokio::test]
    async fn limit_is_capped_at_store_ceiling() {
        let store = MemoryStorage::new();
        let mut writer = BatchWriter::new(&store, 10_000);
        for i in 0..501 {
            writer.push(write(i)).await;
        }
        writer.finish().await;
        assert_eq!(store.commit_sizes().await, vec![500, 1]);
    }

    #[tokio::test]
    async fn failed_chunk_does_not_stop_later_chunks() {
        let store = MemoryStorage::new();
        store.fail_next_commits(1);

        let mut writer = BatchWriter::new(&store, 2);
        for i in 0..5 {
            writer.push(write(i)).await;
        }
        let report = writer.finish().await;

        assert_eq!(report.failed, 2);
        assert_eq!(report.committed, 3);
        assert!(store.product("P0").await.is_none());
        assert!(store.product("P4").await.is_some());
    }

    #[tokio::test]
    async fn empty_flush_commits_nothing() {
        let store = MemoryStorage::new();
        let report = BatchWriter::new(&store, 500).finish().await;
        assert_eq!(report, BatchReport::default());
        assert!(store.commit_sizes().await.is_empty());
    }
}
