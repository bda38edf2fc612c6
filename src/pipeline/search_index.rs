// src/pipeline/search_index.rs

//! Chunked client-side search index.
//!
//! Projects every non-deleted catalog entry into a compact record with
//! single-letter keys, splits the records into fixed-size chunks, and writes
//! the chunks plus a metadata document in one system-document write.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::{CanonicalProduct, Config, IndexResult, ProductStatus};
use crate::storage::{CatalogStore, paths};

/// Compact search record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub id: String,
    /// Name
    pub n: String,
    /// Brand
    pub b: String,
    /// Primary image URL
    pub i: String,
    /// Price
    pub p: f64,
    /// Original price
    pub o: f64,
    /// Has discount
    pub d: bool,
    /// Status
    pub s: ProductStatus,
    /// Additional categories
    pub ac: Vec<String>,
}

impl From<&CanonicalProduct> for IndexEntry {
    fn from(product: &CanonicalProduct) -> Self {
        Self {
            id: product.id.clone(),
            n: product.name.clone().unwrap_or_default(),
            b: product.brand.clone().unwrap_or_default(),
            i: product.image.clone().unwrap_or_default(),
            p: product.price,
            o: product.original_price,
            d: product.has_discount,
            s: product.effective_status(),
            ac: product.additional_categories.clone(),
        }
    }
}

/// Index records for every entry not marked deleted.
pub fn build_entries(products: &[CanonicalProduct]) -> Vec<IndexEntry> {
    products
        .iter()
        .filter(|p| p.effective_status() != ProductStatus::Deleted)
        .map(IndexEntry::from)
        .collect()
}

/// Chunk documents for `entries`, followed by the metadata document.
pub fn index_documents(entries: &[IndexEntry], chunk_size: usize) -> Result<Vec<(String, Value)>> {
    let chunk_size = chunk_size.max(1);
    let now = Utc::now();
    let chunks: Vec<&[IndexEntry]> = entries.chunks(chunk_size).collect();
    let total_chunks = chunks.len();

    let mut documents = Vec::with_capacity(total_chunks + 1);
    for (index, chunk) in chunks.into_iter().enumerate() {
        let items = serde_json::to_value(chunk)?;
        documents.push((
            paths::search_index_chunk(index),
            json!({
                "items": items,
                "chunkIndex": index,
                "count": chunk.len(),
                "totalChunks": total_chunks,
                "updatedAt": now,
            }),
        ));
    }
    documents.push((
        paths::SEARCH_INDEX_META.to_string(),
        json!({
            "totalItems": entries.len(),
            "totalChunks": total_chunks,
            "itemsPerChunk": chunk_size,
            "version": now.timestamp_millis(),
            "updatedAt": now,
        }),
    ));
    Ok(documents)
}

/// Rebuild the search index from the whole catalog.
pub async fn rebuild_search_index(config: &Config, store: &dyn CatalogStore) -> IndexResult {
    match rebuild(config, store).await {
        Ok((total_items, total_chunks)) => {
            log::info!(
                "Search index rebuilt: {} items in {} chunks",
                total_items,
                total_chunks
            );
            IndexResult {
                success: true,
                total_items,
                total_chunks,
                error: None,
            }
        }
        Err(e) => {
            log::error!("Search index rebuild failed: {}", e);
            IndexResult {
                error: Some(e.to_string()),
                ..IndexResult::default()
            }
        }
    }
}

async fn rebuild(config: &Config, store: &dyn CatalogStore) -> Result<(usize, usize)> {
    let products = store.list_products().await?;
    let entries = build_entries(&products);
    let documents = index_documents(&entries, config.index.chunk_size)?;
    store.write_documents(&documents).await?;
    Ok((entries.len(), documents.len() - 1))
}
