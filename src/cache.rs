//! Persistent query-to-answer cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use crate::types::RetrievedChunk;

/// One memoized answer with the chunks its citations refer to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub answer: String,
    pub chunks: Vec<RetrievedChunk>,
}

/// File-backed map from query string to a previously computed answer.
///
/// Keys are the raw query exactly as submitted: case- and
/// whitespace-sensitive, no normalization. Semantically identical queries
/// with different surface forms are distinct entries; normalizing here
/// would renumber the citations of cached chunks, so it is left to callers.
///
/// Every write rewrites the full file while holding the cache lock, so
/// there is a single writer at a time even under concurrent requests.
pub struct AnswerCache {
    path: PathBuf,
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl AnswerCache {
    /// Opens the cache, loading prior entries when the file exists.
    ///
    /// A missing file is the normal cold start; a malformed one resets to
    /// an empty mapping and is logged, never fatal.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(map) => map,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "cache file malformed, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored pair when `query` is an exact key.
    pub async fn get(&self, query: &str) -> Option<CacheEntry> {
        self.entries.lock().await.get(query).cloned()
    }

    /// Inserts (or overwrites) the entry and persists the whole mapping.
    ///
    /// A persistence failure is logged and swallowed: the in-memory map
    /// stays authoritative for the rest of the process.
    pub async fn put(&self, query: &str, answer: String, chunks: Vec<RetrievedChunk>) {
        let mut guard = self.entries.lock().await;
        guard.insert(query.to_string(), CacheEntry { answer, chunks });

        // The file write happens under the lock: full-file rewrites from
        // two writers would otherwise race and lose updates.
        if let Err(err) = persist(&self.path, &guard).await {
            warn!(path = %self.path.display(), error = %err, "failed to persist answer cache");
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

async fn persist(
    path: &Path,
    entries: &HashMap<String, CacheEntry>,
) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let serialized = serde_json::to_string_pretty(entries)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    fs::write(path, serialized).await
}
