//! Windowed, bounded-concurrency detail retrieval.

use futures::future::join_all;

use crate::models::RawRecord;
use crate::services::SourceClient;

/// Fetches full records in fixed-size windows.
///
/// Each window is requested concurrently and awaited as a whole before the
/// next one starts, so at most `width` requests are ever in flight.
pub struct DetailFetcher<'a> {
    client: &'a SourceClient,
    width: usize,
}

impl<'a> DetailFetcher<'a> {
    pub fn new(client: &'a SourceClient, width: usize) -> Self {
        Self {
            client,
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Successfully fetched records for one window, in request order.
    /// Failed fetches are dropped.
    pub async fn fetch_window(&self, ids: &[String]) -> Vec<RawRecord> {
        join_all(ids.iter().map(|id| self.client.fetch_detail(id)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Wait between windows.
    pub async fn pause(&self) {
        tokio::time::sleep(self.client.config().window_delay()).await;
    }

    /// Every fetchable record among `ids`, window by window.
    pub async fn fetch_all(&self, ids: &[String]) -> Vec<RawRecord> {
        let mut records = Vec::with_capacity(ids.len());
        for (index, window) in ids.chunks(self.width).enumerate() {
            if index > 0 {
                self.pause().await;
            }
            records.extend(self.fetch_window(window).await);
        }
        records
    }
}
