//! Environment-driven configuration for the pipeline.

use std::env;
use std::path::PathBuf;

/// Selects the completion backend for the answer generator.
///
/// Two legitimate startup policies exist: fail fast when the real backend
/// is requested without credentials, or run against the mock for local
/// development. The choice is an explicit flag, never a runtime probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorMode {
    Gemini,
    Mock,
}

/// Tunables for corpus processing, retrieval, and generation.
#[derive(Clone, Debug)]
pub struct ScholarConfig {
    /// Root directory for corpus artifacts (`metadata.json`, `processed/`).
    pub data_dir: PathBuf,
    /// Location of the sqlite vector index.
    pub db_path: PathBuf,
    /// Location of the persistent answer cache.
    pub cache_path: PathBuf,
    /// Number of chunks requested per query.
    pub top_k: usize,
    /// Embedding batch size; affects throughput only, never ordering.
    pub batch_size: usize,
    /// Minimum words for a trailing chunk to be emitted.
    pub min_tokens: usize,
    /// Words per emitted chunk window.
    pub max_tokens: usize,
    /// Character budget for the extractive fallback answer.
    pub fallback_max_chars: usize,
    pub generator: GeneratorMode,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            db_path: PathBuf::from("data/scholar_index.sqlite"),
            cache_path: PathBuf::from("cache/scholar_cache.json"),
            top_k: 5,
            batch_size: 64,
            min_tokens: 300,
            max_tokens: 800,
            fallback_max_chars: 4096,
            generator: GeneratorMode::Gemini,
        }
    }
}

impl ScholarConfig {
    /// Builds a configuration from the process environment.
    ///
    /// Loads `.env` first so local development picks up credentials the
    /// same way the rest of the tooling does. Unset or unparsable values
    /// fall back to the defaults above.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let data_dir = env::var("SCHOLAR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let db_path = env::var("SCHOLAR_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("scholar_index.sqlite"));
        let cache_path = env::var("SCHOLAR_CACHE")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_path);

        let generator = if env_flag("SCHOLAR_USE_MOCK") {
            GeneratorMode::Mock
        } else {
            GeneratorMode::Gemini
        };

        Self {
            data_dir,
            db_path,
            cache_path,
            top_k: env_usize("SCHOLAR_TOP_K", defaults.top_k),
            batch_size: env_usize("SCHOLAR_BATCH_SIZE", defaults.batch_size),
            min_tokens: env_usize("SCHOLAR_MIN_TOKENS", defaults.min_tokens),
            max_tokens: env_usize("SCHOLAR_MAX_TOKENS", defaults.max_tokens),
            fallback_max_chars: env_usize("SCHOLAR_FALLBACK_CHARS", defaults.fallback_max_chars),
            generator,
        }
    }

    /// Path of the per-paper metadata file produced by corpus acquisition.
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata.json")
    }

    /// Path of the flat chunk corpus produced by segmentation.
    pub fn chunks_path(&self) -> PathBuf {
        self.data_dir.join("processed/paper_chunks.json")
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
