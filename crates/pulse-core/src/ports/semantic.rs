//! Semantic-similarity port.
//!
//! The embedding service lives outside this core. Adapters only see
//! `semantic_confidence(query, app_name) -> f32`; the scorer bounds the call with a timeout
//! and falls back to keyword matching when it fails.

use crate::config::PulseConfig;
use crate::error::SemanticError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait SemanticConfidence: Send + Sync {
    /// Similarity between `query` and the embeddings stored for `app_name`, nominally in [0, 1].
    async fn semantic_confidence(&self, query: &str, app_name: &str) -> Result<f32, SemanticError>;
}

#[derive(Debug, Serialize)]
struct SemanticRequest<'a> {
    query: &'a str,
    app_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct SemanticReply {
    confidence: f32,
}

/// HTTP client for an embedding service exposing `POST {url}` with
/// `{"query", "app_name"}` → `{"confidence": f32}`.
#[derive(Debug, Clone)]
pub struct HttpSemanticService {
    client: reqwest::Client,
    url: String,
}

impl HttpSemanticService {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Built only when `semantic_url` is configured.
    pub fn from_config(config: &PulseConfig) -> Option<Self> {
        config
            .semantic_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(Self::new)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SemanticConfidence for HttpSemanticService {
    async fn semantic_confidence(&self, query: &str, app_name: &str) -> Result<f32, SemanticError> {
        let response = self
            .client
            .post(&self.url)
            .json(&SemanticRequest { query, app_name })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SemanticError::Status(status.as_u16()));
        }
        let reply: SemanticReply = response.json().await?;
        Ok(reply.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_a_url() {
        let mut config = PulseConfig::default();
        assert!(HttpSemanticService::from_config(&config).is_none());

        config.semantic_url = Some("   ".into());
        assert!(HttpSemanticService::from_config(&config).is_none());

        config.semantic_url = Some(" http://127.0.0.1:7700/confidence ".into());
        let service = HttpSemanticService::from_config(&config).unwrap();
        assert_eq!(service.url(), "http://127.0.0.1:7700/confidence");
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error_not_a_panic() {
        // Port 9 (discard) is closed on test hosts; the connect fails immediately.
        let service = HttpSemanticService::new("http://127.0.0.1:9/confidence");
        let result = service.semantic_confidence("what's my streak", "habits").await;
        assert!(matches!(result, Err(SemanticError::Request(_))));
    }
}
