//! Pipeline stages and job entry points.
//!
//! - `run_full_sync`: crawl, map, reconcile and commit every target, then
//!   clean stale tags
//! - `repair_zero_price`: refetch and fix active entries stored at price 0
//! - `rebuild_search_index`: regenerate the chunked search index

pub mod batch;
pub mod cleanup;
pub mod job;
pub mod map;
pub mod progress;
pub mod reconcile;
pub mod repair;
pub mod search_index;
pub mod sync;

pub use batch::{BatchReport, BatchWriter};
pub use cleanup::{clean_stale_tags, stale_tag_patch};
pub use map::FieldMapper;
pub use progress::ProgressTracker;
pub use reconcile::{SYNC_FIELDS, reconcile};
pub use repair::{REPAIR_FIELDS, price_repair_patch, repair_zero_price};
pub use search_index::{IndexEntry, rebuild_search_index};
pub use sync::run_full_sync;
