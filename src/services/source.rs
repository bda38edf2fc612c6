// src/services/source.rs

//! HTTP client for the source catalog API.
//!
//! Every request goes through [`SourceClient::fetch_json`], which retries on
//! transport errors, non-success statuses, and undecodable bodies, then gives
//! up with `None`. Callers treat `None` as "no data", never as an error.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, COOKIE, USER_AGENT};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{RawRecord, ScraperCredentials, SearchPage, SourceConfig, SyncTarget};
use crate::utils::http::create_async_client;

/// Source API client carrying the session credentials for one run.
pub struct SourceClient {
    client: Client,
    config: SourceConfig,
    user_agent: String,
    cookie: Option<String>,
    backoff: Vec<Duration>,
}

impl SourceClient {
    pub fn new(config: &SourceConfig, credentials: &ScraperCredentials) -> Result<Self> {
        let user_agent = credentials
            .user_agent()
            .unwrap_or(&config.default_user_agent)
            .to_string();

        Ok(Self {
            client: create_async_client(config)?,
            config: config.clone(),
            user_agent,
            cookie: credentials.cookie().map(str::to_string),
            backoff: config.retry_backoff(),
        })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// One page of search results for `target`.
    pub async fn search_page(&self, target: &SyncTarget, page: usize) -> Option<SearchPage> {
        let query = [
            ("fields", "products(code),pagination".to_string()),
            ("query", target.search_query()),
            ("pageSize", self.config.page_size.to_string()),
            ("currentPage", page.to_string()),
        ];
        let value = self.fetch_json(&self.config.search_url(), &query).await?;
        SearchPage::from_value(value)
    }

    /// Full record for one product. `None` when unreachable or malformed.
    pub async fn fetch_detail(&self, code: &str) -> Option<RawRecord> {
        let url = match self.config.detail_url(code) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("No detail endpoint for {}: {}", code, e);
                return None;
            }
        };
        let query = [("fields", "FULL".to_string())];
        let value = self.fetch_json(url.as_str(), &query).await?;
        let record = RawRecord::from_value(value);
        if record.is_none() {
            log::warn!("Detail response for {} has no product code", code);
        }
        record
    }

    /// GET `url` as JSON with bounded retries.
    pub async fn fetch_json(&self, url: &str, query: &[(&str, String)]) -> Option<Value> {
        let mut attempt = 0;
        loop {
            match self.try_fetch_json(url, query).await {
                Ok(value) => return Some(value),
                Err(error) => {
                    let Some(delay) = self.backoff.get(attempt) else {
                        log::warn!(
                            "Giving up on {} after {} attempts: {}",
                            url,
                            attempt + 1,
                            error
                        );
                        return None;
                    };
                    log::debug!("Request to {} failed ({}), retrying", url, error);
                    tokio::time::sleep(*delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn try_fetch_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let mut request = self
            .client
            .get(url)
            .query(query)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json");
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(url, format!("HTTP {status}")));
        }
        Ok(response.json().await?)
    }
}
