//! Builds the persisted index from the chunk corpus.

use tracing::info;

use crate::embeddings::EmbeddingProvider;
use crate::stores::{IndexedChunk, VectorStore};
use crate::types::{Chunk, ChunkMetadata, ScholarError};

/// Summary of one index build.
#[derive(Clone, Copy, Debug)]
pub struct IndexReport {
    pub chunks_indexed: usize,
    pub batches: usize,
}

/// Embeds every chunk and rebuilds the vector store from scratch.
///
/// Batching affects throughput only: the embedding list preserves corpus
/// order with exactly one vector per chunk, and ids are `chunk_<i>` in that
/// order. An embedding-service failure aborts the build — a partial index
/// is worse than a failed one.
pub async fn build_index(
    chunks: &[Chunk],
    provider: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    batch_size: usize,
) -> Result<IndexReport, ScholarError> {
    let batch_size = batch_size.max(1);
    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();

    let mut embeddings = Vec::with_capacity(texts.len());
    let mut batches = 0usize;
    for batch in texts.chunks(batch_size) {
        let vectors = provider.embed_batch(batch).await?;
        if vectors.len() != batch.len() {
            return Err(ScholarError::Embedding(format!(
                "provider returned {} vectors for a batch of {}",
                vectors.len(),
                batch.len()
            )));
        }
        embeddings.extend(vectors);
        batches += 1;
    }

    let documents: Vec<IndexedChunk> = chunks
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (chunk, embedding))| IndexedChunk {
            id: format!("chunk_{i}"),
            text: chunk.text.clone(),
            metadata: ChunkMetadata::from_chunk(chunk),
            embedding,
        })
        .collect();

    store.rebuild(documents).await?;
    info!(
        chunks = chunks.len(),
        batches,
        model = provider.name(),
        "index rebuilt"
    );

    Ok(IndexReport {
        chunks_indexed: chunks.len(),
        batches,
    })
}
