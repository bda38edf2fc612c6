//! Progress document published for operators while a sync runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SyncTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Running,
    Completed,
}

/// Per-target state: `pending -> running -> completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStep {
    pub label: String,
    pub status: StepStatus,
    pub processed: usize,
    pub total: usize,
    pub percentage: u8,
    /// Stored entries carrying the target's tag when the step started
    pub db_count: usize,
}

impl SyncStep {
    pub fn pending(target: &SyncTarget) -> Self {
        Self {
            label: target.display_label.to_string(),
            status: StepStatus::Pending,
            processed: 0,
            total: 0,
            percentage: 0,
            db_count: 0,
        }
    }

    /// Record progress, keeping `percentage` in step with `processed/total`.
    pub fn set_processed(&mut self, processed: usize) {
        self.processed = processed;
        self.percentage = if self.total == 0 {
            0
        } else {
            ((processed as f64 / self.total as f64) * 100.0)
                .round()
                .min(100.0) as u8
        };
    }
}

/// The single, overwritten-in-place progress document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub state: SyncState,
    pub steps: Vec<SyncStep>,
    pub last_updated: DateTime<Utc>,
}

impl SyncProgress {
    /// Fresh document with one pending step per target.
    pub fn for_targets(targets: &[SyncTarget]) -> Self {
        Self {
            state: SyncState::Running,
            steps: targets.iter().map(SyncStep::pending).collect(),
            last_updated: Utc::now(),
        }
    }
}
