//! Plumbing shared by the top-level jobs: leases and credentials.

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{JobLease, LeaseConfig, RunLog, ScraperCredentials};
use crate::storage::CatalogStore;

pub const FULL_SYNC_JOB: &str = "full_sync";
pub const ZERO_PRICE_REPAIR_JOB: &str = "zero_price_repair";

/// Identity of this runner, unique per invocation.
fn holder_id() -> String {
    format!("pid-{}-{}", std::process::id(), Utc::now().timestamp_millis())
}

/// Acquire the lease for `job`.
///
/// Returns `Ok(None)` when leases are disabled and `Err(LeaseHeld)` when
/// another live runner owns it.
pub async fn acquire_lease(
    store: &dyn CatalogStore,
    config: &LeaseConfig,
    job: &str,
) -> Result<Option<JobLease>> {
    if !config.enabled {
        return Ok(None);
    }

    let lease = JobLease::new(job, &holder_id(), config.ttl_secs);
    match store.try_acquire_lease(&lease).await? {
        None => {
            log::debug!("Acquired lease on {} as {}", job, lease.holder);
            Ok(Some(lease))
        }
        Some(current) => Err(AppError::LeaseHeld {
            job: job.to_string(),
            holder: current.holder,
        }),
    }
}

/// Release a lease taken by [`acquire_lease`]. Failures are logged only;
/// the lease then expires on its own.
pub async fn release_lease(store: &dyn CatalogStore, lease: Option<JobLease>) {
    let Some(lease) = lease else {
        return;
    };
    if let Err(e) = store.release_lease(&lease.job, &lease.holder).await {
        log::warn!("Failed to release lease on {}: {}", lease.job, e);
    }
}

/// Stored credentials, or empty ones when missing or unreadable.
pub async fn load_credentials(store: &dyn CatalogStore, log: &mut RunLog) -> ScraperCredentials {
    match store.load_credentials().await {
        Ok(Some(credentials)) => {
            log::info!(
                "Loaded scraper credentials (cookie: {}, user agent: {})",
                if credentials.cookie().is_some() { "set" } else { "none" },
                credentials.user_agent().unwrap_or("default")
            );
            credentials
        }
        Ok(None) => {
            log::info!("No scraper credentials found");
            ScraperCredentials::default()
        }
        Err(e) => {
            log.warn(format!("Failed to fetch scraper settings: {e}"));
            ScraperCredentials::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn disabled_leases_are_skipped() {
        let store = MemoryStorage::new();
        let config = LeaseConfig {
            enabled: false,
            ttl_secs: 600,
        };
        assert!(acquire_lease(&store, &config, FULL_SYNC_JOB).await.unwrap().is_none());
        assert!(store.document("system/lease_full_sync").await.is_none());
    }

    #[tokio::test]
    async fn held_lease_is_reported() {
        let store = MemoryStorage::new();
        let other = JobLease::new(FULL_SYNC_JOB, "someone-else", 600);
        store.try_acquire_lease(&other).await.unwrap();

        let err = acquire_lease(&store, &LeaseConfig::default(), FULL_SYNC_JOB)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LeaseHeld { ref holder, .. } if holder == "someone-else"));
    }

    #[tokio::test]
    async fn acquire_then_release() {
        let store = MemoryStorage::new();
        let lease = acquire_lease(&store, &LeaseConfig::default(), ZERO_PRICE_REPAIR_JOB)
            .await
            .unwrap();
        assert!(lease.is_some());
        assert!(store.document("system/lease_zero_price_repair").await.is_some());

        release_lease(&store, lease).await;
        assert!(store.document("system/lease_zero_price_repair").await.is_none());
    }

    #[tokio::test]
    async fn unreadable_credentials_fall_back_to_empty() {
        let store = MemoryStorage::new();
        store.fail_credentials(true);
        let mut log = RunLog::new();

        let creds = load_credentials(&store, &mut log).await;
        assert_eq!(creds, ScraperCredentials::default());
        assert_eq!(log.lines().len(), 1);
    }
}
