//! Remote OpenAI-Compatible Embeddings
//!
//! Talks to any endpoint implementing the OpenAI `/embeddings` shape
//! (OpenAI itself, llama.cpp server, vLLM, LM Studio, ...). Transient
//! failures (network errors, timeouts, 429, 5xx) are retried with
//! exponential backoff; other 4xx responses surface immediately.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{l2_normalize, EmbeddingError};
use crate::config::EmbeddingConfig;

/// Request timeout per embedding call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries after the initial attempt for transient failures
const MAX_RETRIES: u32 = 1;

/// Initial backoff, doubled per retry
const BACKOFF_BASE_MS: u64 = 500;

/// Texts per request
const BATCH_SIZE: usize = 32;

/// Model assumed when the configuration names none
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Dimensions of the default model
const DEFAULT_DIMENSIONS: usize = 1536;

/// Endpoint assumed when no `api_base` is configured
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Remote embedding provider
pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    index: usize,
}

/// Build the request URL from a configured base. The base is used verbatim
/// when it already ends in the embeddings path, otherwise `/embeddings` is
/// appended. Only http(s) schemes are accepted.
fn resolve_endpoint(api_base: &str) -> Result<String, EmbeddingError> {
    let base = if api_base.is_empty() {
        DEFAULT_API_BASE
    } else {
        api_base
    };
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(EmbeddingError::InvalidConfig(format!(
            "api_base must use http or https: {base}"
        )));
    }
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/embeddings") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/embeddings"))
    }
}

impl RemoteEmbedder {
    /// Create a remote embedder from the embedding configuration
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let endpoint = resolve_endpoint(&config.api_base)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            dimensions: config.dimensions.unwrap_or(DEFAULT_DIMENSIONS),
        })
    }

    /// Stable model identifier
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Output vector length
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a single text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let batch = [text.to_string()];
        let mut vectors = self.request_with_retry(&batch).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Failed("no embedding in response".to_string()))
    }

    /// Embed a batch of texts, chunked to keep request payloads bounded
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            all.extend(self.request_with_retry(chunk).await?);
        }
        Ok(all)
    }

    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut attempt = 0;
        loop {
            match self.request(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_transient() && attempt < MAX_RETRIES => {
                    let backoff = Duration::from_millis(BACKOFF_BASE_MS << attempt);
                    tracing::warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "transient embedding failure, retrying: {e}"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!("{status}: {detail}");
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(EmbeddingError::Transient(message))
            } else {
                Err(EmbeddingError::Failed(message))
            };
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Failed(format!("malformed response: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::Failed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        let mut items = parsed.data;
        items.sort_by_key(|item| item.index);

        let mut vectors = Vec::with_capacity(items.len());
        for mut item in items {
            if item.embedding.len() != self.dimensions {
                return Err(EmbeddingError::Failed(format!(
                    "model returned {} dimensions, expected {}",
                    item.embedding.len(),
                    self.dimensions
                )));
            }
            l2_normalize(&mut item.embedding);
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> EmbeddingError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        EmbeddingError::Transient(e.to_string())
    } else {
        EmbeddingError::Failed(e.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_endpoint_appends_path() {
        assert_eq!(
            resolve_endpoint("http://localhost:8080/v1").unwrap(),
            "http://localhost:8080/v1/embeddings"
        );
    }

    #[test]
    fn test_resolve_endpoint_verbatim_when_already_complete() {
        assert_eq!(
            resolve_endpoint("http://localhost:8080/v1/embeddings").unwrap(),
            "http://localhost:8080/v1/embeddings"
        );
    }

    #[test]
    fn test_resolve_endpoint_strips_trailing_slash() {
        assert_eq!(
            resolve_endpoint("https://api.example.com/v1/").unwrap(),
            "https://api.example.com/v1/embeddings"
        );
    }

    #[test]
    fn test_resolve_endpoint_default_base() {
        assert_eq!(
            resolve_endpoint("").unwrap(),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn test_resolve_endpoint_rejects_bad_scheme() {
        assert!(resolve_endpoint("ftp://example.com").is_err());
        assert!(resolve_endpoint("example.com/v1").is_err());
    }
}
