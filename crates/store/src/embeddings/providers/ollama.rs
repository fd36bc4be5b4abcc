//! Ollama Embedding Provider
//!
//! Provides semantic embeddings via Ollama's local API using models like
//! nomic-embed-text. Ollama embeds one text per request, so batches are sent
//! sequentially. Transport failures and 5xx responses are retried with
//! exponential backoff; anything else fails at once.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::Client;
use semdoc_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Ollama API endpoint for embeddings
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Maximum attempts per text
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Ollama embedding provider using the local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Outcome of one failed request.
#[derive(Debug)]
enum Failure {
    /// Worth another attempt: unreachable server, 5xx or rate limiting.
    Transient(AppError),
    /// Will fail the same way again: unknown model, bad payload, wrong size.
    Permanent(AppError),
}

impl Failure {
    fn for_status(status: reqwest::StatusCode, error: AppError) -> Self {
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Failure::Transient(error)
        } else {
            Failure::Permanent(error)
        }
    }
}

impl OllamaProvider {
    /// Create a provider. The endpoint comes from the config, then `OLLAMA_URL`,
    /// then the local default. No request is made until the first embedding.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::EmbeddingUnavailable(format!(
                    "Failed to create HTTP client for Ollama: {}",
                    e
                ))
            })?;

        let base_url = config
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// Embed single text with retry logic
    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut attempt = 0;

        loop {
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(Failure::Permanent(e)) => return Err(e),
                Err(Failure::Transient(e)) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(e);
                    }

                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, MAX_RETRIES, backoff_ms, e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    /// Embed single text (no retries)
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>, Failure> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Failure::Transient(AppError::EmbeddingUnavailable(format!(
                    "Failed to reach Ollama at {}: {}",
                    self.base_url, e
                )))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);

            return Err(Failure::for_status(
                status,
                AppError::EmbeddingUnavailable(format!("Ollama API error ({}): {}", status, detail)),
            ));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            Failure::Permanent(AppError::EmbeddingUnavailable(format!(
                "Failed to parse Ollama response: {}",
                e
            )))
        })?;

        if body.embedding.len() != self.dimensions {
            return Err(Failure::Permanent(AppError::DimensionMismatch {
                expected: self.dimensions,
                actual: body.embedding.len(),
            }));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for text in texts {
            embeddings.push(self.embed_with_retries(text).await?);
        }

        debug!("Embedded batch of {} texts", embeddings.len());
        Ok(embeddings)
    }
}
