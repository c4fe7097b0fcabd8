//! Embeds queries and reshapes nearest-neighbour results.

use std::sync::Arc;

use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::stores::VectorStore;
use crate::types::{RetrievedChunk, ScholarError};

/// Query-time lookup against the persisted index.
///
/// Holds the embedding provider and store handles, which are expensive to
/// initialise; construct once per process and share. The provider must be
/// the one the index was built with.
#[derive(Clone)]
pub struct Retriever {
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embeddings: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embeddings, store }
    }

    /// Returns at most `k` chunks ranked best-first by the store.
    ///
    /// The store's ranking is taken as-is (no re-ranking); its similarity
    /// score is attached to each chunk's metadata for downstream ordering.
    /// An empty collection yields an empty vector, never an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, ScholarError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let vectors = self.embeddings.embed_batch(&[query.to_string()]).await?;
        let query_embedding = vectors
            .into_iter()
            .next()
            .ok_or_else(|| ScholarError::Embedding("provider returned no query vector".into()))?;

        let hits = self.store.search(&query_embedding, k).await?;
        debug!(query, hits = hits.len(), "retrieval complete");

        Ok(hits
            .into_iter()
            .map(|hit| {
                let mut metadata = hit.metadata;
                metadata.similarity_score = Some(hit.similarity);
                RetrievedChunk {
                    id: hit.id,
                    text: hit.text,
                    metadata,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::stores::{IndexedChunk, SearchHit};
    use crate::types::ChunkMetadata;
    use async_trait::async_trait;

    struct StubStore {
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl VectorStore for StubStore {
        async fn rebuild(&self, _: Vec<IndexedChunk>) -> Result<(), ScholarError> {
            Ok(())
        }

        async fn search(&self, _: &[f32], k: usize) -> Result<Vec<SearchHit>, ScholarError> {
            Ok(self.hits.iter().take(k).cloned().collect())
        }

        async fn count(&self) -> Result<usize, ScholarError> {
            Ok(self.hits.len())
        }
    }

    fn hit(id: &str, similarity: f32) -> SearchHit {
        SearchHit {
            id: id.into(),
            text: format!("text for {id}"),
            metadata: ChunkMetadata {
                paper_id: "1234.5678v1".into(),
                paper_title: "Ridge".into(),
                authors: "Hoerl, A.".into(),
                section: "results".into(),
                chunk_index: 0,
                similarity_score: None,
            },
            similarity,
        }
    }

    fn retriever(hits: Vec<SearchHit>) -> Retriever {
        Retriever::new(
            Arc::new(MockEmbeddingProvider::new()),
            Arc::new(StubStore { hits }),
        )
    }

    #[tokio::test]
    async fn attaches_similarity_in_store_order() {
        let retriever = retriever(vec![hit("chunk_3", 0.91), hit("chunk_7", 0.64)]);
        let chunks = retriever.retrieve("what is ridge regression", 5).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "chunk_3");
        assert_eq!(chunks[0].metadata.similarity_score, Some(0.91));
        assert_eq!(chunks[1].metadata.similarity_score, Some(0.64));
    }

    #[tokio::test]
    async fn caps_results_at_k() {
        let retriever = retriever((0..8).map(|i| hit(&format!("chunk_{i}"), 0.5)).collect());
        let chunks = retriever.retrieve("regularization", 3).await.unwrap();
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn empty_collection_is_not_an_error() {
        let retriever = retriever(Vec::new());
        let chunks = retriever.retrieve("anything", 5).await.unwrap();
        assert!(chunks.is_empty());
    }
}
