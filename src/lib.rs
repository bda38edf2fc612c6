// src/lib.rs

//! Catalog Sync Library
//!
//! Keeps a product catalog in step with an external e-commerce source for a
//! fixed set of targets, repairs zero-price entries, and builds a chunked
//! search index over the result.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

pub use pipeline::{rebuild_search_index, repair_zero_price, run_full_sync};
