//! End-to-end pipeline tests against a real sqlite-vec store.
//!
//! These exercise segment → index → retrieve → answer with deterministic
//! mock embeddings, suitable for CI.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::tempdir;

use regression_scholar::cache::AnswerCache;
use regression_scholar::embeddings::MockEmbeddingProvider;
use regression_scholar::generation::{AnswerOutcome, CompletionProvider, Scholar};
use regression_scholar::indexer::build_index;
use regression_scholar::ingestion::{ChunkingLimits, segment_paper};
use regression_scholar::retrieval::Retriever;
use regression_scholar::stores::{SqliteVectorStore, VectorStore};
use regression_scholar::types::{Chunk, Paper, ScholarError};

fn chunk(i: usize, paper_id: &str, section: &str, text: &str) -> Chunk {
    Chunk {
        text: text.into(),
        paper_id: paper_id.into(),
        paper_title: format!("Paper {paper_id}"),
        authors: vec!["Doe, J.".into(), "Roe, R.".into()],
        section: section.into(),
        chunk_index: i,
    }
}

struct CapturingCompletion {
    prompts: Mutex<Vec<String>>,
}

impl CapturingCompletion {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CompletionProvider for CapturingCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, ScholarError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Ridge regression adds an L2 penalty [1].".to_string())
    }

    fn name(&self) -> &str {
        "capturing"
    }
}

#[tokio::test]
async fn index_and_retrieve_round_trips_metadata() {
    let dir = tempdir().unwrap();
    let store = SqliteVectorStore::open(dir.path().join("index.sqlite"))
        .await
        .unwrap();
    let provider = MockEmbeddingProvider::new();

    let chunks = vec![
        chunk(0, "1234.5678v1", "introduction", "ridge regression shrinks coefficients"),
        chunk(1, "1234.5678v1", "methods", "the l2 penalty is added to the loss"),
        chunk(2, "2101.00001v2", "results", "the lasso selects sparse models"),
    ];
    build_index(&chunks, &provider, &store, 2).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);

    let retriever = Retriever::new(Arc::new(provider), Arc::new(store));
    let retrieved = retriever.retrieve("what is ridge regression", 3).await.unwrap();
    assert_eq!(retrieved.len(), 3);

    // Values written at indexing time come back unchanged.
    let hit = retrieved.iter().find(|c| c.id == "chunk_1").unwrap();
    assert_eq!(hit.metadata.paper_id, "1234.5678v1");
    assert_eq!(hit.metadata.paper_title, "Paper 1234.5678v1");
    assert_eq!(hit.metadata.section, "methods");
    assert_eq!(hit.metadata.authors, "Doe, J., Roe, R.");
    assert_eq!(hit.text, "the l2 penalty is added to the loss");
    assert!(retrieved.iter().all(|c| c.metadata.similarity_score.is_some()));
}

#[tokio::test]
async fn search_results_are_ranked_best_first() {
    let dir = tempdir().unwrap();
    let store = SqliteVectorStore::open(dir.path().join("index.sqlite"))
        .await
        .unwrap();
    let provider = MockEmbeddingProvider::new();

    let query = "regularization paths for the lasso";
    // One chunk is the query text itself, so it must rank first.
    let chunks = vec![
        chunk(0, "a.1", "methods", "completely unrelated text about kernels"),
        chunk(1, "a.2", "methods", query),
        chunk(2, "a.3", "methods", "another unrelated passage on splines"),
    ];
    build_index(&chunks, &provider, &store, 64).await.unwrap();

    let retriever = Retriever::new(Arc::new(provider), Arc::new(store));
    let retrieved = retriever.retrieve(query, 2).await.unwrap();

    assert_eq!(retrieved.len(), 2);
    assert_eq!(retrieved[0].id, "chunk_1");
    let top = retrieved[0].metadata.similarity_score.unwrap();
    let next = retrieved[1].metadata.similarity_score.unwrap();
    assert!(top >= next);
    assert!(top > 0.99, "identical text should score ~1, got {top}");
}

#[tokio::test]
async fn rebuild_replaces_the_previous_collection() {
    let dir = tempdir().unwrap();
    let store = SqliteVectorStore::open(dir.path().join("index.sqlite"))
        .await
        .unwrap();
    let provider = MockEmbeddingProvider::new();

    let first = vec![
        chunk(0, "old.1", "methods", "old corpus text one"),
        chunk(1, "old.1", "results", "old corpus text two"),
    ];
    build_index(&first, &provider, &store, 64).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);

    let second = vec![chunk(0, "new.1", "methods", "fresh corpus text")];
    build_index(&second, &provider, &store, 64).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);

    let retriever = Retriever::new(Arc::new(provider), Arc::new(store));
    let retrieved = retriever.retrieve("anything", 10).await.unwrap();
    assert_eq!(retrieved.len(), 1);
    assert_eq!(retrieved[0].metadata.paper_id, "new.1");
}

#[tokio::test]
async fn unbuilt_store_yields_empty_results_not_errors() {
    let dir = tempdir().unwrap();
    let store = SqliteVectorStore::open(dir.path().join("index.sqlite"))
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 0);
    let hits = store.search(&[0.1, 0.2, 0.3], 5).await.unwrap();
    assert!(hits.is_empty());

    let retriever = Retriever::new(Arc::new(MockEmbeddingProvider::new()), Arc::new(store));
    let retrieved = retriever.retrieve("ridge", 5).await.unwrap();
    assert!(retrieved.is_empty());
}

#[tokio::test]
async fn segmented_corpus_flows_through_ask() {
    let dir = tempdir().unwrap();

    // A small synthetic paper with a reference section that must vanish.
    let body: Vec<String> = (0..30).map(|i| format!("evidence{i}")).collect();
    let raw_text = format!(
        "Some stray preamble line\nIntroduction\n{}\nReferences\n[1] dropped entry",
        body.join(" ")
    );
    let paper = Paper {
        arxiv_id: "1234.5678v1".into(),
        title: "Windowed Chunking".into(),
        authors: vec!["Doe, J.".into()],
        abstract_text: String::new(),
        published: "2024-01-01".into(),
        categories: vec!["stat.ML".into()],
        pdf_path: PathBuf::from("unused.pdf"),
    };
    let limits = ChunkingLimits {
        min_tokens: 5,
        max_tokens: 20,
    };
    let chunks = segment_paper(&raw_text, &paper, limits);
    assert!(!chunks.is_empty());
    assert!(chunks.iter().all(|c| c.section != "references"));

    let store = SqliteVectorStore::open(dir.path().join("index.sqlite"))
        .await
        .unwrap();
    let provider = MockEmbeddingProvider::new();
    build_index(&chunks, &provider, &store, 64).await.unwrap();

    let retriever = Retriever::new(Arc::new(provider), Arc::new(store));
    let cache = AnswerCache::open(dir.path().join("cache.json")).await;
    let completion = CapturingCompletion::new();
    let scholar = Scholar::new(retriever, completion.clone(), cache, 3, 4096);

    let answer = scholar.answer("what does the introduction say").await;
    assert!(matches!(answer.outcome, AnswerOutcome::Generated(_)));
    assert!(!answer.chunks.is_empty());

    // The prompt numbered the assembled evidence.
    let prompts = completion.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[1] "));
    drop(prompts);

    let response = scholar.ask("what does the introduction say").await;
    assert_eq!(response.answer, "Ridge regression adds an L2 penalty [1].");
    assert_eq!(response.sources.len(), 1);
    assert_eq!(
        response.sources[0].link.as_deref(),
        Some("https://arxiv.org/abs/1234.5678")
    );
    assert_eq!(
        response.sources[0].paper_title.as_deref(),
        Some("Windowed Chunking")
    );
}
