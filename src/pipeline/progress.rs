//! Throttled publication of the sync progress document.

use std::time::{Duration, Instant};

use chrono::Utc;

use crate::models::{StepStatus, SyncProgress, SyncState, SyncTarget};
use crate::storage::CatalogStore;

/// Owns the in-memory progress snapshot for one run and publishes it.
///
/// Step transitions and the final state are always published; updates in
/// between are published at most once per `interval`. Publish failures are
/// logged and swallowed.
pub struct ProgressTracker<'a> {
    store: &'a dyn CatalogStore,
    progress: SyncProgress,
    interval: Duration,
    last_publish: Option<Instant>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(store: &'a dyn CatalogStore, targets: &[SyncTarget], interval: Duration) -> Self {
        Self {
            store,
            progress: SyncProgress::for_targets(targets),
            interval,
            last_publish: None,
        }
    }

    pub fn progress(&self) -> &SyncProgress {
        &self.progress
    }

    /// Mark step `index` running with its pre-run tag count.
    pub async fn start_step(&mut self, index: usize, db_count: usize) {
        if let Some(step) = self.progress.steps.get_mut(index) {
            step.status = StepStatus::Running;
            step.db_count = db_count;
        }
        self.publish(true).await;
    }

    pub async fn set_total(&mut self, index: usize, total: usize) {
        if let Some(step) = self.progress.steps.get_mut(index) {
            step.total = total;
            step.set_processed(0);
        }
        self.publish(false).await;
    }

    pub async fn record_processed(&mut self, index: usize, processed: usize) {
        if let Some(step) = self.progress.steps.get_mut(index) {
            step.set_processed(processed);
        }
        self.publish(false).await;
    }

    /// Mark step `index` completed at 100%.
    pub async fn complete_step(&mut self, index: usize) {
        if let Some(step) = self.progress.steps.get_mut(index) {
            step.status = StepStatus::Completed;
            step.processed = step.total;
            step.percentage = 100;
        }
        self.publish(true).await;
    }

    /// Mark the whole job completed.
    pub async fn finish(&mut self) {
        self.progress.state = SyncState::Completed;
        self.publish(true).await;
    }

    /// Publish the snapshot unless throttled. Returns whether it was written.
    pub async fn publish(&mut self, force: bool) -> bool {
        let throttled = self
            .last_publish
            .is_some_and(|last| last.elapsed() < self.interval);
        if throttled && !force {
            return false;
        }

        self.progress.last_updated = Utc::now();
        match self.store.save_progress(&self.progress).await {
            Ok(()) => {
                self.last_publish = Some(Instant::now());
                true
            }
            Err(e) => {
                log::warn!("Progress update failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TARGETS;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn transitions_bypass_throttle() {
        let store = MemoryStorage::new();
        let mut tracker = ProgressTracker::new(&store, &TARGETS, Duration::from_secs(3600));

        tracker.start_step(0, 12).await;
        tracker.set_total(0, 10).await;
        tracker.record_processed(0, 5).await;
        tracker.complete_step(0).await;
        tracker.finish().await;

        let history = store.progress_history().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].steps[0].status, StepStatus::Running);
        assert_eq!(history[0].steps[0].db_count, 12);
        assert_eq!(history[1].steps[0].status, StepStatus::Completed);
        assert_eq!(history[1].steps[0].percentage, 100);
        assert_eq!(history[1].steps[0].processed, 10);
        assert_eq!(history[2].state, SyncState::Completed);
    }

    #[tokio::test]
    async fn zero_interval_publishes_every_update() {
        let store = MemoryStorage::new();
        let mut tracker = ProgressTracker::new(&store, &TARGETS, Duration::ZERO);

        tracker.set_total(1, 4).await;
        tracker.record_processed(1, 2).await;

        let history = store.progress_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].steps[1].percentage, 50);
    }

    #[tokio::test]
    async fn first_update_is_published() {
        let store = MemoryStorage::new();
        let mut tracker = ProgressTracker::new(&store, &TARGETS, Duration::from_secs(3600));
        assert!(tracker.publish(false).await);
        assert!(!tracker.publish(false).await);
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        let store = MemoryStorage::new();
        store.fail_progress(true);
        let mut tracker = ProgressTracker::new(&store, &TARGETS, Duration::ZERO);

        tracker.start_step(0, 0).await;
        assert!(!tracker.publish(true).await);
        assert_eq!(tracker.progress().steps[0].status, StepStatus::Running);

        store.fail_progress(false);
        assert!(tracker.publish(true).await);
    }
}
