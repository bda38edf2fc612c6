//! Service layer talking to the source catalog.
//!
//! This module contains:
//! - The shared HTTP client with retry (`SourceClient`)
//! - Identifier discovery per target (`IdCrawler`)
//! - Windowed detail retrieval (`DetailFetcher`)

mod crawler;
mod fetcher;
mod source;

pub use crawler::IdCrawler;
pub use fetcher::DetailFetcher;
pub use source::SourceClient;
