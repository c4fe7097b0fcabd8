//! Grounded answer generation with a deterministic extractive fallback.
//!
//! ```text
//! query ──► cache lookup ──hit──► stored (answer, chunks)
//!              │miss
//!              ▼
//!          retrieve ──empty──► NoEvidence sentinel (never cached)
//!              │chunks
//!              ▼
//!      assemble ► prompt ► model ──ok──► Generated ─┐
//!                            │err                   ├─► cache write ► return
//!                            ▼                      │
//!                   extractive Fallback ────────────┘
//! ```

mod providers;

use std::sync::Arc;

use tracing::{info, warn};

pub use providers::{
    CompletionProvider, GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL, GeminiCompletion, MockCompletion,
};

use crate::assembly;
use crate::cache::AnswerCache;
use crate::config::{GeneratorMode, ScholarConfig};
use crate::retrieval::Retriever;
use crate::sources::resolve_sources;
use crate::types::{RetrievedChunk, ScholarError, Source};

/// Fixed reply when retrieval yields no evidence.
pub const NO_RESULTS_MESSAGE: &str = "No relevant papers found for this query.";

/// How a terminal answer was produced.
///
/// Callers distinguish degraded responses from full ones through this type
/// rather than by sniffing the answer text.
#[derive(Clone, Debug, PartialEq)]
pub enum AnswerOutcome {
    /// The model answered from the supplied evidence.
    Generated(String),
    /// The model call failed; the text is extractive concatenation and was
    /// produced fully offline.
    Fallback { text: String, reason: String },
    /// Retrieval produced nothing to ground an answer on.
    NoEvidence,
}

impl AnswerOutcome {
    pub fn text(&self) -> &str {
        match self {
            AnswerOutcome::Generated(text) => text,
            AnswerOutcome::Fallback { text, .. } => text,
            AnswerOutcome::NoEvidence => NO_RESULTS_MESSAGE,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, AnswerOutcome::Generated(_))
    }
}

/// Full result of answering one query.
#[derive(Clone, Debug)]
pub struct ScholarAnswer {
    pub outcome: AnswerOutcome,
    /// Assembled evidence in the order the citation markers refer to.
    pub chunks: Vec<RetrievedChunk>,
    /// `true` when the pair came straight from the answer cache.
    pub cached: bool,
}

/// The client-visible reply shape: always an answer, never an error.
#[derive(Clone, Debug, PartialEq)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Retrieval-augmented answer generator.
pub struct Scholar {
    retriever: Retriever,
    completion: Arc<dyn CompletionProvider>,
    cache: AnswerCache,
    top_k: usize,
    fallback_max_chars: usize,
}

impl Scholar {
    pub fn new(
        retriever: Retriever,
        completion: Arc<dyn CompletionProvider>,
        cache: AnswerCache,
        top_k: usize,
        fallback_max_chars: usize,
    ) -> Self {
        Self {
            retriever,
            completion,
            cache,
            top_k,
            fallback_max_chars,
        }
    }

    /// Builds a generator from configuration.
    ///
    /// The backend is selected by the explicit mode flag: the real client
    /// fails fast on a missing credential, the mock needs none. No runtime
    /// probing for availability.
    pub async fn from_config(
        config: &ScholarConfig,
        retriever: Retriever,
    ) -> Result<Self, ScholarError> {
        let completion: Arc<dyn CompletionProvider> = match config.generator {
            GeneratorMode::Gemini => Arc::new(GeminiCompletion::from_env()?),
            GeneratorMode::Mock => Arc::new(MockCompletion),
        };
        let cache = AnswerCache::open(&config.cache_path).await;
        Ok(Self::new(
            retriever,
            completion,
            cache,
            config.top_k,
            config.fallback_max_chars,
        ))
    }

    /// Runs the answer state machine for one query.
    ///
    /// A cache hit short-circuits before retrieval, so repeated identical
    /// queries never re-invoke retrieval or the model. The no-evidence
    /// sentinel is not cached: such queries are retried fresh next time.
    pub async fn answer(&self, query: &str) -> ScholarAnswer {
        if let Some(entry) = self.cache.get(query).await {
            info!("answer served from cache");
            return ScholarAnswer {
                outcome: AnswerOutcome::Generated(entry.answer),
                chunks: entry.chunks,
                cached: true,
            };
        }

        let chunks = match self.retriever.retrieve(query, self.top_k).await {
            Ok(chunks) => chunks,
            Err(err) => {
                warn!(error = %err, "retrieval failed, treating as no evidence");
                Vec::new()
            }
        };

        if chunks.is_empty() {
            return ScholarAnswer {
                outcome: AnswerOutcome::NoEvidence,
                chunks: Vec::new(),
                cached: false,
            };
        }

        let chunks = assembly::assemble(chunks);
        let prompt = build_prompt(query, &chunks);

        let outcome = match self.completion.complete(&prompt).await {
            Ok(text) => AnswerOutcome::Generated(text),
            Err(err) => {
                warn!(error = %err, "completion failed, falling back to extractive answer");
                AnswerOutcome::Fallback {
                    text: assembly::extractive_answer(&chunks, self.fallback_max_chars),
                    reason: err.to_string(),
                }
            }
        };

        self.cache
            .put(query, outcome.text().to_string(), chunks.clone())
            .await;

        ScholarAnswer {
            outcome,
            chunks,
            cached: false,
        }
    }

    /// The `ask` contract: always succeeds, degrading instead of erroring.
    pub async fn ask(&self, question: &str) -> AskResponse {
        let answer = self.answer(question).await;
        let records: Vec<serde_json::Value> = answer
            .chunks
            .iter()
            .filter_map(|chunk| serde_json::to_value(chunk).ok())
            .collect();
        AskResponse {
            answer: answer.outcome.text().to_string(),
            sources: resolve_sources(&records),
        }
    }
}

/// Numbers the assembled evidence `[1]..[n]` and instructs the model to
/// answer strictly from it, citing by bracket position.
pub fn build_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    let numbered_context = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an expert researcher in statistical learning and regression analysis.\n\
         \n\
         CRITICAL INSTRUCTIONS:\n\
         1. Answer ONLY using information from the provided papers\n\
         2. Include ALL relevant technical terminology (L1, L2, regularization, etc.)\n\
         3. Provide mathematical formulations when relevant\n\
         4. Cite sources using [1], [2], etc.\n\
         5. Be comprehensive but precise\n\
         \n\
         Question: {question}\n\
         \n\
         Research Papers:\n\
         {numbered_context}\n\
         \n\
         Provide a thorough answer covering:\n\
         - Clear definitions with proper terminology\n\
         - Mathematical formulation (if applicable)\n\
         - Key properties and characteristics\n\
         - Practical implications\n\
         - Comparisons (if asked)\n\
         \n\
         Answer:"
    )
}
