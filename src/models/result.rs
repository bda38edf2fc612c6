//! Results returned to the caller of each job. Never persisted.

use serde::Serialize;

/// Outcome of a full sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncResult {
    pub success: bool,
    /// Documents committed by the main pass
    pub saved: usize,
    /// Records that could not be fetched or committed
    pub failed: usize,
    /// Tags stripped by stale-tag cleanup, across all targets
    pub cleaned: usize,
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a zero-price repair run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepairResult {
    pub success: bool,
    pub updated: usize,
    /// Products whose refetch still had no usable price
    pub unresolved: Vec<String>,
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a search index rebuild.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResult {
    pub success: bool,
    pub total_items: usize,
    pub total_chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Operator-facing log lines collected during a run, mirrored to `log`.
#[derive(Debug, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.lines.push(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.lines.push(message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.lines.push(message);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}
