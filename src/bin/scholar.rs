//! Command-line driver: batch indexing and interactive asking.
//!
//! ```bash
//! scholar index                 # embed the chunk corpus into the sqlite index
//! scholar ask "What is ridge regression?"
//! scholar ask                   # interactive loop
//! ```

use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tracing_subscriber::FmtSubscriber;

use regression_scholar::config::ScholarConfig;
use regression_scholar::embeddings::{
    EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider,
};
use regression_scholar::generation::Scholar;
use regression_scholar::indexer::build_index;
use regression_scholar::ingestion::load_chunks;
use regression_scholar::retrieval::Retriever;
use regression_scholar::stores::SqliteVectorStore;
use regression_scholar::types::ScholarError;

#[tokio::main]
async fn main() -> Result<(), ScholarError> {
    init_tracing();
    let config = ScholarConfig::from_env();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("index") => run_index(&config).await,
        Some("ask") => {
            let question = args.collect::<Vec<_>>().join(" ");
            run_ask(&config, question).await
        }
        _ => {
            eprintln!("usage: scholar <index | ask [question]>");
            Ok(())
        }
    }
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Embedding backend selection is explicit configuration: an endpoint URL
/// means the HTTP provider, otherwise the deterministic mock is used.
fn embedding_provider() -> Result<Arc<dyn EmbeddingProvider>, ScholarError> {
    match env::var("SCHOLAR_EMBEDDINGS_URL") {
        Ok(base_url) => {
            let model = env::var("SCHOLAR_EMBEDDINGS_MODEL")
                .unwrap_or_else(|_| "all-mpnet-base-v2".to_string());
            let dims = env::var("SCHOLAR_EMBEDDINGS_DIMS")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(768);
            let api_key = env::var("SCHOLAR_EMBEDDINGS_API_KEY").ok();
            Ok(Arc::new(HttpEmbeddingProvider::new(
                &base_url, model, dims, api_key,
            )?))
        }
        Err(_) => {
            println!("SCHOLAR_EMBEDDINGS_URL not set; using deterministic mock embeddings");
            Ok(Arc::new(MockEmbeddingProvider::new()))
        }
    }
}

async fn open_store(config: &ScholarConfig) -> Result<Arc<SqliteVectorStore>, ScholarError> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(Arc::new(SqliteVectorStore::open(&config.db_path).await?))
}

async fn run_index(config: &ScholarConfig) -> Result<(), ScholarError> {
    let chunks_path = config.chunks_path();
    let chunks = load_chunks(&chunks_path).await.map_err(|err| {
        ScholarError::InvalidDocument(format!(
            "could not load chunk corpus from {}: {err}",
            chunks_path.display()
        ))
    })?;
    println!("Loaded {} chunks from {}", chunks.len(), chunks_path.display());

    let provider = embedding_provider()?;
    let store = open_store(config).await?;

    let report = build_index(&chunks, provider.as_ref(), store.as_ref(), config.batch_size).await?;

    println!("\nIndex build complete");
    println!("  chunks indexed : {}", report.chunks_indexed);
    println!("  batches        : {}", report.batches);
    println!("  database       : {}", config.db_path.display());
    Ok(())
}

async fn run_ask(config: &ScholarConfig, question: String) -> Result<(), ScholarError> {
    let provider = embedding_provider()?;
    let store = open_store(config).await?;
    let retriever = Retriever::new(provider, store);
    let scholar = Scholar::from_config(config, retriever).await?;

    if !question.trim().is_empty() {
        answer_one(&scholar, question.trim()).await;
        return Ok(());
    }

    println!("Ask about regression, LASSO, ridge, elastic net, and related topics.");
    println!("Type 'exit' or 'quit' to leave.\n");

    let stdin = io::stdin();
    loop {
        print!("Ask your question: ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        answer_one(&scholar, query).await;
    }
    Ok(())
}

async fn answer_one(scholar: &Scholar, question: &str) {
    let response = scholar.ask(question).await;

    println!("\n{}", "=".repeat(80));
    println!("Answer:\n\n{}", response.answer);
    println!("{}", "=".repeat(80));

    if response.sources.is_empty() {
        return;
    }
    println!("\nSources:");
    for (i, source) in response.sources.iter().enumerate() {
        println!(
            "\n{}. {}",
            i + 1,
            source.paper_title.as_deref().unwrap_or("Unknown")
        );
        if let Some(authors) = &source.authors {
            println!("   Authors: {authors}");
        }
        if let Some(link) = &source.link {
            println!("   Link: {link}");
        }
        if let Some(section) = &source.section {
            println!("   Section: {section}");
        }
    }
    println!();
}
