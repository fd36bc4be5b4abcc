//! OpenAI-compatible embedding provider.
//!
//! Talks to any service exposing the `POST {endpoint}/embeddings` shape
//! (OpenAI, DashScope compatible mode, vLLM, LiteLLM, ...). Whole batches are
//! sent in one request.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::Client;
use semdoc_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

// Hand-written so the credential never reaches logs.
impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiProvider {
    /// Create a provider, reading the credential from the configured
    /// environment variable (default `OPENAI_API_KEY`).
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let key_env = config
            .api_key_env
            .as_deref()
            .unwrap_or(DEFAULT_API_KEY_ENV);

        let api_key = std::env::var(key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::EmbeddingUnavailable(format!(
                    "API key not found in environment variable: {}",
                    key_env
                ))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::EmbeddingUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        let endpoint = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.endpoint);
        debug!("Sending {} texts to {}", texts.len(), url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::EmbeddingUnavailable(format!("Failed to reach {}: {}", self.endpoint, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(AppError::EmbeddingUnavailable(format!(
                "Embedding API error ({}): {}",
                status, detail
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::EmbeddingUnavailable(format!("Failed to parse embedding response: {}", e))
        })?;

        if body.data.len() != texts.len() {
            return Err(AppError::EmbeddingUnavailable(format!(
                "Embedding API returned {} vectors for {} texts",
                body.data.len(),
                texts.len()
            )));
        }

        // Each index in 0..n must appear exactly once.
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for item in body.data {
            if item.embedding.len() != self.dimensions {
                return Err(AppError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: item.embedding.len(),
                });
            }
            match slots.get_mut(item.index) {
                Some(slot) if slot.is_none() => *slot = Some(item.embedding),
                Some(_) => {
                    return Err(AppError::EmbeddingUnavailable(format!(
                        "Embedding API returned index {} twice",
                        item.index
                    )));
                }
                None => {
                    return Err(AppError::EmbeddingUnavailable(format!(
                        "Embedding API returned index {} for {} texts",
                        item.index,
                        texts.len()
                    )));
                }
            }
        }

        // Counts match and indices are unique, so every slot is filled.
        Ok(slots.into_iter().flatten().collect())
    }
}
