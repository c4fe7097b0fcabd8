//! Storage backends for the chunk index.
//!
//! One logical collection of `(id, document, metadata, embedding)` records
//! behind the [`VectorStore`] trait. The index is rebuilt in a batch step
//! and read-only while serving; there is no incremental merge path.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{ChunkMetadata, ScholarError};

pub use sqlite::SqliteVectorStore;

/// The persisted unit of the index.
///
/// `id` is a synthetic sequential identifier assigned at indexing time and
/// stable only within one index build.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// One ranked result from a nearest-neighbour lookup.
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub similarity: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Replaces the entire collection with `documents`.
    ///
    /// Dropping the previous collection is best-effort (a missing one is
    /// not an error); the insert itself is a single bulk operation.
    async fn rebuild(&self, documents: Vec<IndexedChunk>) -> Result<(), ScholarError>;

    /// Returns up to `k` hits ranked best-first by the store's metric.
    ///
    /// An absent or empty collection yields an empty vector, never an
    /// error.
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, ScholarError>;

    /// Number of documents currently indexed.
    async fn count(&self) -> Result<usize, ScholarError>;
}
