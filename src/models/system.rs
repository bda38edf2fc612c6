//! System documents: scraping credentials and job leases.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Optional session credentials attached to every source request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperCredentials {
    #[serde(default)]
    pub cookie: String,
    #[serde(default)]
    pub user_agent: String,
}

impl ScraperCredentials {
    pub fn cookie(&self) -> Option<&str> {
        Some(self.cookie.trim()).filter(|c| !c.is_empty())
    }

    pub fn user_agent(&self) -> Option<&str> {
        Some(self.user_agent.trim()).filter(|ua| !ua.is_empty())
    }
}

/// Longest lease a runner may hold, whatever the configured TTL.
const MAX_LEASE_SECS: u64 = 7 * 24 * 60 * 60;

/// Claim on a named job, preventing overlapping runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLease {
    pub job: String,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl JobLease {
    pub fn new(job: &str, holder: &str, ttl_secs: u64) -> Self {
        let now = Utc::now();
        let ttl = Duration::seconds(ttl_secs.min(MAX_LEASE_SECS) as i64);
        Self {
            job: job.to_string(),
            holder: holder.to_string(),
            acquired_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether `candidate` may replace this lease.
    pub fn yields_to(&self, candidate: &JobLease) -> bool {
        self.holder == candidate.holder || self.is_expired(candidate.acquired_at)
    }
}
