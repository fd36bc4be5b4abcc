//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use semdoc_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations return one vector per input text, in input order, each of
/// [`dimensions`](EmbeddingProvider::dimensions) components. Connection and
/// credential failures are reported as `AppError::EmbeddingUnavailable`.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "hashing", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results.pop().ok_or_else(|| {
            AppError::EmbeddingUnavailable("provider returned no embedding".to_string())
        })
    }
}

/// Create an embedding provider based on configuration.
///
/// Credentials are read from the environment variable named by
/// `config.api_key_env` at construction time.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    config.validate()?;

    match config.provider.as_str() {
        "hashing" => {
            let provider = super::providers::hashing::HashingProvider::new(
                config.model.clone(),
                config.dimensions,
            );
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let provider = super::providers::ollama::OllamaProvider::new(config)?;
            Ok(Arc::new(provider))
        }

        "openai" => {
            let provider = super::providers::openai::OpenAiProvider::new(config)?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: hashing, ollama, openai",
            config.provider
        ))),
    }
}
