//! Core data model and error type shared across the pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Errors surfaced by the retrieval-augmented pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ScholarError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("completion error: {0}")]
    Completion(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// One paper from the corpus metadata file.
///
/// Produced by the (out-of-scope) acquisition step and treated as immutable
/// here; `arxiv_id` is the unique identifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Paper {
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub published: String,
    pub categories: Vec<String>,
    pub pdf_path: PathBuf,
}

/// A bounded span of a paper's text, the atomic unit of retrieval.
///
/// `chunk_index` increments per paper across all surviving sections in
/// emission order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub paper_id: String,
    pub paper_title: String,
    pub authors: Vec<String>,
    pub section: String,
    pub chunk_index: usize,
}

/// Flat metadata persisted alongside each indexed chunk.
///
/// `authors` is joined into a single display string at indexing time.
/// `similarity_score` is attached by the retriever at query time only and
/// is never written to the index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub paper_id: String,
    pub paper_title: String,
    pub authors: String,
    pub section: String,
    pub chunk_index: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub similarity_score: Option<f32>,
}

impl ChunkMetadata {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            paper_id: chunk.paper_id.clone(),
            paper_title: chunk.paper_title.clone(),
            authors: chunk.authors.join(", "),
            section: chunk.section.clone(),
            chunk_index: chunk.chunk_index,
            similarity_score: None,
        }
    }
}

/// A ranked chunk as returned by the retrieval service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A deduplicated, display-ready citation record derived from chunks.
///
/// Ephemeral: recomputed per response, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_joins_authors_for_display() {
        let chunk = Chunk {
            text: "ridge shrinks coefficients".into(),
            paper_id: "1234.5678v1".into(),
            paper_title: "Ridge Regression Revisited".into(),
            authors: vec!["Hoerl, A.".into(), "Kennard, R.".into()],
            section: "introduction".into(),
            chunk_index: 0,
        };
        let meta = ChunkMetadata::from_chunk(&chunk);
        assert_eq!(meta.authors, "Hoerl, A., Kennard, R.");
        assert_eq!(meta.similarity_score, None);
    }

    #[test]
    fn paper_metadata_round_trips_abstract_key() {
        let raw = serde_json::json!({
            "arxiv_id": "2101.00001v2",
            "title": "Lasso Paths",
            "authors": ["Tibshirani, R."],
            "abstract": "We study the lasso.",
            "published": "2021-01-01",
            "categories": ["stat.ME", "stat.ML"],
            "pdf_path": "data/papers/2101.00001v2.pdf"
        });
        let paper: Paper = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(paper.abstract_text, "We study the lasso.");
        let back = serde_json::to_value(&paper).unwrap();
        assert_eq!(back["abstract"], raw["abstract"]);
    }
}
