//! Identifier discovery over the paginated search endpoint.

use std::collections::HashSet;

use crate::models::SyncTarget;
use crate::services::SourceClient;

/// Collects the identifiers the source currently lists for a target.
pub struct IdCrawler<'a> {
    client: &'a SourceClient,
}

impl<'a> IdCrawler<'a> {
    pub fn new(client: &'a SourceClient) -> Self {
        Self { client }
    }

    /// De-duplicated identifiers for `target`, in first-seen order.
    ///
    /// Stops at the reported page count, at `max_pages`, or at the first
    /// missing or malformed page. Partial results are returned as-is.
    pub async fn collect_ids(&self, target: &SyncTarget) -> Vec<String> {
        let config = self.client.config();
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut page = 0;
        let mut total_pages = 1;

        while page < total_pages && page < config.max_pages {
            let Some(result) = self.client.search_page(target, page).await else {
                log::warn!("Search for {} ended at page {}: no data", target.code, page);
                break;
            };
            if result.products.is_none() {
                log::debug!("Search for {} ended at page {}: no products", target.code, page);
                break;
            }

            if let Some(reported) = result.total_pages() {
                total_pages = reported;
            }
            for code in result.codes() {
                if seen.insert(code.to_string()) {
                    ids.push(code.to_string());
                }
            }

            page += 1;
            tokio::time::sleep(config.page_delay()).await;
        }

        if page >= config.max_pages && page < total_pages {
            log::warn!(
                "Search for {} capped at {} of {} pages",
                target.code,
                config.max_pages,
                total_pages
            );
        }
        ids
    }
}
