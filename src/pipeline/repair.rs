//! Zero-price repair.
//!
//! Refetches a bounded set of active entries stored with `price == 0` and
//! writes back price-family fields only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::{Config, RawRecord, RepairResult, RunLog};
use crate::pipeline::batch::BatchWriter;
use crate::pipeline::job::{ZERO_PRICE_REPAIR_JOB, acquire_lease, load_credentials, release_lease};
use crate::services::{DetailFetcher, SourceClient};
use crate::storage::{CatalogStore, Document, DocumentWrite};

/// Fields a repair may write. Nothing else is ever touched.
pub const REPAIR_FIELDS: &[&str] = &[
    "price",
    "originalPrice",
    "hasDiscount",
    "lastScraped",
    "lastFixed",
];

/// Price-family fields from a refetched record with a usable price.
pub fn price_repair_patch(record: &RawRecord, now: DateTime<Utc>) -> Option<Document> {
    let price = record.price_value();
    if price <= 0.0 {
        return None;
    }
    let original_price = record.base_price_value();

    let mut fields = Document::new();
    fields.insert("price".to_string(), json!(price));
    fields.insert("originalPrice".to_string(), json!(original_price));
    fields.insert("hasDiscount".to_string(), Value::Bool(original_price > price));
    fields.insert("lastScraped".to_string(), json!(now));
    fields.insert("lastFixed".to_string(), json!(now));
    Some(fields)
}

/// Run the zero-price repair.
///
/// Never fails: orchestration errors come back as `success = false` with
/// the message in `error`.
pub async fn repair_zero_price(config: &Config, store: &dyn CatalogStore) -> RepairResult {
    let mut log = RunLog::new();
    let mut result = RepairResult::default();

    let lease = match acquire_lease(store, &config.lease, ZERO_PRICE_REPAIR_JOB).await {
        Ok(lease) => lease,
        Err(e) => {
            log.error(format!("Zero-price fix not started: {e}"));
            result.error = Some(e.to_string());
            result.logs = log.into_lines();
            return result;
        }
    };

    let outcome = repair(config, store, &mut log, &mut result).await;
    release_lease(store, lease).await;

    match outcome {
        Ok(()) => result.success = true,
        Err(e) => {
            log.error(format!("Error: {e}"));
            result.error = Some(e.to_string());
        }
    }
    result.logs = log.into_lines();
    result
}

async fn repair(
    config: &Config,
    store: &dyn CatalogStore,
    log: &mut RunLog,
    result: &mut RepairResult,
) -> Result<()> {
    log.info("Starting zero-price fix...");
    let credentials = load_credentials(store, log).await;

    let candidates = store.find_zero_price_active(config.sync.repair_limit).await?;
    if candidates.is_empty() {
        log.info("No zero-price active products found.");
        return Ok(());
    }
    log.info(format!("Found {} products with 0 price.", candidates.len()));

    let client = SourceClient::new(&config.source, &credentials)?;
    let fetcher = DetailFetcher::new(&client, config.sync.repair_concurrency);
    let ids: Vec<String> = candidates.into_iter().map(|p| p.id).collect();
    let records = fetcher.fetch_all(&ids).await;
    let by_id: HashMap<&str, &RawRecord> = records.iter().map(|r| (r.id(), r)).collect();

    let now = Utc::now();
    let mut writer = BatchWriter::new(store, config.sync.update_batch_limit);
    for id in &ids {
        let fields = by_id
            .get(id.as_str())
            .and_then(|record| price_repair_patch(record, now));
        match fields {
            Some(fields) => {
                log.info(format!("Fixed {}: {}", id, fields["price"]));
                writer.push(DocumentWrite::merge(id.clone(), fields)).await;
            }
            None => {
                log.warn(format!("Failed to fetch valid price for {id}"));
                result.unresolved.push(id.clone());
            }
        }
    }

    let report = writer.finish().await;
    result.updated = report.committed;
    if report.failed > 0 {
        log.error(format!("{} price updates failed to commit", report.failed));
    }
    log.info(format!("Successfully updated {} products.", report.committed));
    Ok(())
}
