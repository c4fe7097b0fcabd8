//! ```text
//! Corpus artifacts ──► ingestion::segmenter ──► Vec<Chunk>
//!                                   │
//! Vec<Chunk> ──► indexer::build_index ──┬─► embeddings::EmbeddingProvider
//!                                       └─► stores::SqliteVectorStore
//!
//! query ──► retrieval::Retriever ──► assembly ──► cache::AnswerCache
//!                                        │             │ (miss)
//!                                        └─► generation::Scholar ──► sources
//! ```
//!
pub mod assembly;
pub mod cache;
pub mod config;
pub mod embeddings;
pub mod evaluate;
pub mod generation;
pub mod indexer;
pub mod ingestion;
pub mod retrieval;
pub mod sources;
pub mod stores;
pub mod types;

pub use cache::{AnswerCache, CacheEntry};
pub use config::{GeneratorMode, ScholarConfig};
pub use embeddings::{EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider};
pub use generation::{AnswerOutcome, AskResponse, Scholar, ScholarAnswer};
pub use retrieval::Retriever;
pub use sources::resolve_sources;
pub use stores::{SqliteVectorStore, VectorStore};
pub use types::{Chunk, ChunkMetadata, Paper, RetrievedChunk, ScholarError, Source};
