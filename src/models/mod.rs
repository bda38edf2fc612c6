// src/models/mod.rs

//! Domain models for the catalog sync engine.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod product;
mod progress;
mod raw;
mod result;
mod system;
pub mod target;

// Re-export all public types
pub use config::{Config, IndexConfig, LeaseConfig, LoggingConfig, SourceConfig, SyncConfig};
pub use product::{CanonicalProduct, ProductImage, ProductPatch, ProductStatus, Specification};
pub use progress::{StepStatus, SyncProgress, SyncState, SyncStep};
pub use raw::{
    Pagination, RawClassification, RawFeature, RawFeatureValue, RawImage, RawPrice, RawRecord,
    SearchHit, SearchPage,
};
pub use result::{IndexResult, RepairResult, RunLog, SyncResult};
pub use system::{JobLease, ScraperCredentials};
pub use target::{QueryKind, SyncTarget, TARGETS};
