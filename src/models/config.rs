//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::storage::STORE_COMMIT_LIMIT;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source endpoints and HTTP behavior
    #[serde(default)]
    pub source: SourceConfig,

    /// Pipeline widths, batch ceilings, and throttling
    #[serde(default)]
    pub sync: SyncConfig,

    /// Cross-invocation mutual exclusion
    #[serde(default)]
    pub lease: LeaseConfig,

    /// Search index generation
    #[serde(default)]
    pub index: IndexConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.source.base()?;
        if self.source.default_user_agent.trim().is_empty() {
            return Err(AppError::validation("source.default_user_agent is empty"));
        }
        if self.source.page_size == 0 {
            return Err(AppError::validation("source.page_size must be > 0"));
        }
        if self.source.max_pages == 0 {
            return Err(AppError::validation("source.max_pages must be > 0"));
        }
        if self.source.timeout_secs == Some(0) {
            return Err(AppError::validation("source.timeout_secs must be > 0 when set"));
        }
        if self.sync.detail_concurrency == 0 || self.sync.repair_concurrency == 0 {
            return Err(AppError::validation("sync concurrency widths must be > 0"));
        }
        for (name, limit) in [
            ("sync.update_batch_limit", self.sync.update_batch_limit),
            ("sync.cleanup_batch_limit", self.sync.cleanup_batch_limit),
        ] {
            if limit == 0 || limit > STORE_COMMIT_LIMIT {
                return Err(AppError::validation(format!(
                    "{name} must be between 1 and {STORE_COMMIT_LIMIT}"
                )));
            }
        }
        if self.sync.repair_limit == 0 {
            return Err(AppError::validation("sync.repair_limit must be > 0"));
        }
        if self.lease.enabled && self.lease.ttl_secs == 0 {
            return Err(AppError::validation("lease.ttl_secs must be > 0"));
        }
        if self.index.chunk_size == 0 {
            return Err(AppError::validation("index.chunk_size must be > 0"));
        }
        Ok(())
    }
}

/// Source endpoints and HTTP client behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Origin of the source site; also used to absolutize image paths
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// REST prefix under the origin, e.g. `/rest/v2/korea`
    #[serde(default = "defaults::api_path")]
    pub api_path: String,

    /// User-Agent used when the credentials document does not provide one
    #[serde(default = "defaults::user_agent")]
    pub default_user_agent: String,

    /// Brand recorded when the source has no manufacturer
    #[serde(default = "defaults::default_brand")]
    pub default_brand: String,

    /// Search page size
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Hard cap on search pages per target
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Delay between search page requests in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Delay between detail windows in milliseconds
    #[serde(default = "defaults::window_delay")]
    pub window_delay_ms: u64,

    /// Wait before each retry; the table length is the retry count
    #[serde(default = "defaults::retry_delays")]
    pub retry_delays_ms: Vec<u64>,

    /// Optional per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl SourceConfig {
    /// Parsed base origin.
    pub fn base(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| AppError::config(format!("invalid source.base_url '{}': {e}", self.base_url)))
    }

    /// Endpoint for paginated product search.
    pub fn search_url(&self) -> String {
        format!("{}/products/search", self.api_root())
    }

    /// Endpoint for a single product's full record.
    ///
    /// `code` is pushed as one path segment, so reserved characters in it are
    /// percent-encoded.
    pub fn detail_url(&self, code: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_root())?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::config(format!("source.base_url '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push("products")
            .push(code);
        Ok(url)
    }

    fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_path.trim_matches('/')
        )
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn window_delay(&self) -> Duration {
        Duration::from_millis(self.window_delay_ms)
    }

    /// Retry backoff table as durations.
    pub fn retry_backoff(&self) -> Vec<Duration> {
        self.retry_delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            api_path: defaults::api_path(),
            default_user_agent: defaults::user_agent(),
            default_brand: defaults::default_brand(),
            page_size: defaults::page_size(),
            max_pages: defaults::max_pages(),
            page_delay_ms: defaults::page_delay(),
            window_delay_ms: defaults::window_delay(),
            retry_delays_ms: defaults::retry_delays(),
            timeout_secs: None,
        }
    }
}

/// Pipeline widths, batch ceilings, and throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Detail requests in flight per window during the main pass
    #[serde(default = "defaults::detail_concurrency")]
    pub detail_concurrency: usize,

    /// Detail requests in flight per window during zero-price repair
    #[serde(default = "defaults::repair_concurrency")]
    pub repair_concurrency: usize,

    /// Maximum products examined per zero-price repair run
    #[serde(default = "defaults::repair_limit")]
    pub repair_limit: usize,

    /// Maximum writes per update commit
    #[serde(default = "defaults::update_batch_limit")]
    pub update_batch_limit: usize,

    /// Maximum writes per cleanup commit
    #[serde(default = "defaults::cleanup_batch_limit")]
    pub cleanup_batch_limit: usize,

    /// Minimum spacing between throttled progress publications
    #[serde(default = "defaults::progress_interval")]
    pub progress_interval_ms: u64,

    /// Value stamped into each product's `source` field
    #[serde(default = "defaults::source_name")]
    pub source_name: String,
}

impl SyncConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            detail_concurrency: defaults::detail_concurrency(),
            repair_concurrency: defaults::repair_concurrency(),
            repair_limit: defaults::repair_limit(),
            update_batch_limit: defaults::update_batch_limit(),
            cleanup_batch_limit: defaults::cleanup_batch_limit(),
            progress_interval_ms: defaults::progress_interval(),
            source_name: defaults::source_name(),
        }
    }
}

/// Job lease settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    #[serde(default = "defaults::lease_enabled")]
    pub enabled: bool,

    /// Seconds after which an unreleased lease may be taken over
    #[serde(default = "defaults::lease_ttl")]
    pub ttl_secs: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::lease_enabled(),
            ttl_secs: defaults::lease_ttl(),
        }
    }
}

/// Search index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Entries per index chunk document
    #[serde(default = "defaults::index_chunk_size")]
    pub chunk_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::index_chunk_size(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn base_url() -> String {
        "https://www.costco.co.kr".into()
    }
    pub fn api_path() -> String {
        "/rest/v2/korea".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn default_brand() -> String {
        "Costco".into()
    }
    pub fn page_size() -> usize {
        100
    }
    pub fn max_pages() -> usize {
        20
    }
    pub fn page_delay() -> u64 {
        50
    }
    pub fn window_delay() -> u64 {
        100
    }
    pub fn retry_delays() -> Vec<u64> {
        vec![500, 500, 500]
    }

    // Sync defaults
    pub fn detail_concurrency() -> usize {
        15
    }
    pub fn repair_concurrency() -> usize {
        5
    }
    pub fn repair_limit() -> usize {
        50
    }
    pub fn update_batch_limit() -> usize {
        500
    }
    pub fn cleanup_batch_limit() -> usize {
        400
    }
    pub fn progress_interval() -> u64 {
        2000
    }
    pub fn source_name() -> String {
        "catalog_sync".into()
    }

    // Lease defaults
    pub fn lease_enabled() -> bool {
        true
    }
    pub fn lease_ttl() -> u64 {
        600
    }

    pub fn index_chunk_size() -> usize {
        500
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.source.default_user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.sync.detail_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_batch_limit_above_store_ceiling() {
        let mut config = Config::default();
        config.sync.update_batch_limit = STORE_COMMIT_LIMIT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.source.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [source]
            base_url = "http://127.0.0.1:9000"
            retry_delays_ms = [1, 1]

            [sync]
            detail_concurrency = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.source.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.source.page_size, 100);
        assert_eq!(config.source.retry_backoff().len(), 2);
        assert_eq!(config.sync.detail_concurrency, 3);
        assert_eq!(config.sync.cleanup_batch_limit, 400);
        assert!(config.lease.enabled);
    }

    #[test]
    fn endpoint_urls_join_cleanly() {
        let mut source = SourceConfig::default();
        source.base_url = "http://localhost:8080/".to_string();
        source.api_path = "/rest/v2/korea/".to_string();

        assert_eq!(
            source.search_url(),
            "http://localhost:8080/rest/v2/korea/products/search"
        );
        assert_eq!(
            source.detail_url("X1").unwrap().as_str(),
            "http://localhost:8080/rest/v2/korea/products/X1"
        );
    }

    #[test]
    fn detail_url_encodes_reserved_characters_in_code() {
        let source = SourceConfig::default();
        let url = source.detail_url("A/1?x#y").unwrap();

        assert_eq!(url.path(), "/rest/v2/korea/products/A%2F1%3Fx%23y");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }
}
