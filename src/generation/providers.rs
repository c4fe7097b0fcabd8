//! Completion backends for the answer generator.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::ScholarError;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// One blocking completion call for an already-built prompt.
    async fn complete(&self, prompt: &str) -> Result<String, ScholarError>;

    fn name(&self) -> &str;
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug)]
pub struct GeminiCompletion {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    model: String,
}

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash";

impl GeminiCompletion {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ScholarError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ScholarError::Config("empty GEMINI_API_KEY".into()));
        }
        let base_url = Url::parse(base_url)
            .map_err(|err| ScholarError::Config(format!("invalid gemini base url: {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            model: model.into(),
        })
    }

    /// Reads `GEMINI_API_KEY` (required) and `GEMINI_MODEL` (optional).
    ///
    /// A missing credential is a fatal configuration error here; callers
    /// that prefer a degraded process select the mock backend instead.
    pub fn from_env() -> Result<Self, ScholarError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| {
            ScholarError::Config("GEMINI_API_KEY not found in environment".into())
        })?;
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| GEMINI_DEFAULT_MODEL.to_string());
        Self::new(api_key, model, GEMINI_BASE_URL)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl CompletionProvider for GeminiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, ScholarError> {
        let endpoint = self
            .base_url
            .join(&format!("/v1beta/models/{}:generateContent", self.model))
            .map_err(|err| ScholarError::Completion(err.to_string()))?;

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", self.api_key.trim())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ScholarError::Completion(format!(
                "gemini returned {status}: {text}"
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        let answer: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(ScholarError::Completion("gemini returned no candidates".into()));
        }
        Ok(answer)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Offline backend that answers with a canned grounded reply.
#[derive(Clone, Debug, Default)]
pub struct MockCompletion;

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, ScholarError> {
        Ok("Mock expert answer derived from the supplied evidence [1].".to_string())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn gemini_parses_candidate_parts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .header("x-goog-api-key", "test-key");
            then.status(200).json_body(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "Ridge regression " },
                            { "text": "adds an L2 penalty [1]." }
                        ]
                    }
                }]
            }));
        });

        let provider =
            GeminiCompletion::new("test-key", GEMINI_DEFAULT_MODEL, &server.base_url()).unwrap();
        let answer = provider.complete("What is ridge regression?").await.unwrap();

        mock.assert();
        assert_eq!(answer, "Ridge regression adds an L2 penalty [1].");
    }

    #[tokio::test]
    async fn gemini_maps_http_failure_to_completion_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(429).body("quota exceeded");
        });

        let provider =
            GeminiCompletion::new("test-key", GEMINI_DEFAULT_MODEL, &server.base_url()).unwrap();
        let err = provider.complete("prompt").await.unwrap_err();
        assert!(matches!(err, ScholarError::Completion(_)));
    }

    #[tokio::test]
    async fn gemini_rejects_empty_candidates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({ "candidates": [] }));
        });

        let provider =
            GeminiCompletion::new("test-key", GEMINI_DEFAULT_MODEL, &server.base_url()).unwrap();
        let err = provider.complete("prompt").await.unwrap_err();
        assert!(matches!(err, ScholarError::Completion(_)));
    }

    #[test]
    fn empty_api_key_is_a_config_error() {
        let err = GeminiCompletion::new("  ", GEMINI_DEFAULT_MODEL, GEMINI_BASE_URL).unwrap_err();
        assert!(matches!(err, ScholarError::Config(_)));
    }
}
