//! Embedding service boundary.
//!
//! Index build and query embedding must go through the same provider:
//! vectors from different models do not share a similarity space, so mixing
//! them silently invalidates every ranking the store returns.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::ScholarError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of texts: one vector per input, order preserved.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScholarError>;

    /// Identifier recorded to keep index- and query-time models consistent.
    fn name(&self) -> &str;

    /// Dimensionality of the produced vectors.
    fn ndims(&self) -> usize;
}

/// Deterministic hash-derived embeddings for tests and offline runs.
#[derive(Clone, Debug, Default)]
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dims: 8 }
    }

    pub fn with_dims(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScholarError> {
        Ok(texts
            .iter()
            .map(|text| hash_to_vec(text, self.dims))
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn ndims(&self) -> usize {
        self.dims.max(1)
    }
}

fn hash_to_vec(text: &str, dims: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dims.max(1))
        .map(|i| {
            let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
            (bits as f64 / u64::MAX as f64) as f32
        })
        .collect()
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    dims: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        dims: usize,
        api_key: Option<String>,
    ) -> Result<Self, ScholarError> {
        let base = Url::parse(base_url)
            .map_err(|err| ScholarError::Config(format!("invalid embeddings url: {err}")))?;
        let endpoint = base
            .join("/v1/embeddings")
            .map_err(|err| ScholarError::Config(format!("invalid embeddings url: {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            model: model.into(),
            dims,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScholarError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(self.endpoint.clone()).json(&EmbeddingsRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.trim());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScholarError::Embedding(format!(
                "embeddings endpoint returned {status}: {body}"
            )));
        }

        let mut parsed: EmbeddingsResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(ScholarError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }

    fn name(&self) -> &str {
        &self.model
    }

    fn ndims(&self) -> usize {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "ridge regression".to_string(),
            "lasso".to_string(),
            "ridge regression".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
        assert!(first.iter().all(|v| v.len() == provider.ndims()));
    }

    #[tokio::test]
    async fn http_provider_preserves_input_order() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200).json_body(serde_json::json!({
                "data": [
                    { "index": 1, "embedding": [0.4, 0.5] },
                    { "index": 0, "embedding": [0.1, 0.2] }
                ]
            }));
        });

        let provider =
            HttpEmbeddingProvider::new(&server.base_url(), "all-mpnet-base-v2", 2, None).unwrap();
        let vectors = provider
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        mock.assert();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.4, 0.5]]);
    }

    #[tokio::test]
    async fn http_provider_rejects_count_mismatch() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200).json_body(serde_json::json!({
                "data": [ { "index": 0, "embedding": [0.1] } ]
            }));
        });

        let provider =
            HttpEmbeddingProvider::new(&server.base_url(), "all-mpnet-base-v2", 1, None).unwrap();
        let err = provider
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ScholarError::Embedding(_)));
    }
}
