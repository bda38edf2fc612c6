// src/pipeline/sync.rs

//! Full catalog sync.
//!
//! Targets run one at a time in registry order. For each target:
//! crawl ids, fetch details window by window, map and reconcile each record,
//! commit the window, then strip the target's tag from entries the source no
//! longer lists.

use std::collections::HashSet;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, RunLog, SyncResult, SyncTarget, TARGETS};
use crate::pipeline::batch::BatchWriter;
use crate::pipeline::cleanup::clean_stale_tags;
use crate::pipeline::job::{FULL_SYNC_JOB, acquire_lease, load_credentials, release_lease};
use crate::pipeline::map::FieldMapper;
use crate::pipeline::progress::ProgressTracker;
use crate::pipeline::reconcile::reconcile;
use crate::services::{DetailFetcher, IdCrawler, SourceClient};
use crate::storage::CatalogStore;

/// Run the full sync over every registered target.
///
/// Never fails: orchestration errors come back as `success = false` with
/// the message in `error`.
pub async fn run_full_sync(config: &Config, store: &dyn CatalogStore) -> SyncResult {
    let mut log = RunLog::new();
    let mut result = SyncResult::default();

    let lease = match acquire_lease(store, &config.lease, FULL_SYNC_JOB).await {
        Ok(lease) => lease,
        Err(e) => {
            log.error(format!("Sync not started: {e}"));
            result.error = Some(e.to_string());
            result.logs = log.into_lines();
            return result;
        }
    };

    let outcome = sync_all_targets(config, store, &mut log, &mut result).await;
    release_lease(store, lease).await;

    match outcome {
        Ok(()) => {
            result.success = true;
            log.info(format!(
                "Sync complete: {} saved, {} failed, {} tags cleaned",
                result.saved, result.failed, result.cleaned
            ));
        }
        Err(e) => {
            log.error(format!("Sync failed: {e}"));
            result.error = Some(e.to_string());
        }
    }
    result.logs = log.into_lines();
    result
}

async fn sync_all_targets(
    config: &Config,
    store: &dyn CatalogStore,
    log: &mut RunLog,
    result: &mut SyncResult,
) -> Result<()> {
    let credentials = load_credentials(store, log).await;
    let client = SourceClient::new(&config.source, &credentials)?;

    let mut run = SyncRun {
        config,
        store,
        mapper: FieldMapper::new(config)?,
        crawler: IdCrawler::new(&client),
        fetcher: DetailFetcher::new(&client, config.sync.detail_concurrency),
        tracker: ProgressTracker::new(store, &TARGETS, config.sync.progress_interval()),
        log,
        result,
    };

    run.tracker.publish(true).await;
    for (index, target) in TARGETS.iter().enumerate() {
        run.sync_target(index, target).await?;
    }
    run.tracker.finish().await;
    Ok(())
}

/// Per-run state threaded through every target.
struct SyncRun<'a> {
    config: &'a Config,
    store: &'a dyn CatalogStore,
    mapper: FieldMapper,
    crawler: IdCrawler<'a>,
    fetcher: DetailFetcher<'a>,
    tracker: ProgressTracker<'a>,
    log: &'a mut RunLog,
    result: &'a mut SyncResult,
}

impl SyncRun<'_> {
    async fn sync_target(&mut self, index: usize, target: &SyncTarget) -> Result<()> {
        self.log.info(format!("Scanning {}...", target.code));

        let db_count = match self.store.count_by_tag(target.tag_name).await {
            Ok(count) => count,
            Err(e) => {
                log::warn!("Could not count '{}' entries: {}", target.tag_name, e);
                0
            }
        };
        self.tracker.start_step(index, db_count).await;

        let ids = self.crawler.collect_ids(target).await;
        self.tracker.set_total(index, ids.len()).await;
        self.log.info(format!(
            "Found {} items for {}. Fetching...",
            ids.len(),
            target.code
        ));

        self.process_ids(index, target, &ids).await?;

        self.log
            .info(format!("Cleaning up expired {} items...", target.tag_name));
        let current: HashSet<String> = ids.into_iter().collect();
        let cleanup = clean_stale_tags(
            self.store,
            target,
            &current,
            self.config.sync.cleanup_batch_limit,
        )
        .await?;
        self.result.cleaned += cleanup.committed;

        if cleanup.failed > 0 {
            self.log.error(format!(
                "Failed to remove '{}' from {} items",
                target.tag_name, cleanup.failed
            ));
        }
        if cleanup.committed > 0 {
            self.log.info(format!(
                "Removed '{}' tag from {} expired items.",
                target.tag_name, cleanup.committed
            ));
        } else if cleanup.failed == 0 {
            self.log
                .info(format!("No expired '{}' items found.", target.tag_name));
        }

        self.tracker.complete_step(index).await;
        Ok(())
    }

    /// Fetch, reconcile, and commit `ids` one window at a time.
    async fn process_ids(&mut self, index: usize, target: &SyncTarget, ids: &[String]) -> Result<()> {
        let mut writer = BatchWriter::new(self.store, self.config.sync.update_batch_limit);
        let mut processed = 0;

        for (window_index, window) in ids.chunks(self.fetcher.width()).enumerate() {
            if window_index > 0 {
                self.fetcher.pause().await;
            }

            let records = self.fetcher.fetch_window(window).await;
            self.result.failed += window.len().saturating_sub(records.len());

            let found: Vec<String> = records.iter().map(|r| r.id().to_string()).collect();
            let existing = self.store.get_products(&found).await?;
            let now = Utc::now();

            for record in &records {
                let patch = self.mapper.map_record(record, target.code, now);
                match reconcile(patch, existing.get(record.id())) {
                    Ok(write) => writer.push(write).await,
                    Err(e) => {
                        log::warn!("Skipping {}: {}", record.id(), e);
                        self.result.failed += 1;
                    }
                }
            }
            writer.flush().await;

            processed += window.len();
            self.tracker.record_processed(index, processed).await;
        }

        let report = writer.finish().await;
        self.result.saved += report.committed;
        self.result.failed += report.failed;
        if report.failed > 0 {
            self.log.error(format!(
                "{} writes for {} failed to commit",
                report.failed, target.code
            ));
        }
        Ok(())
    }
}
