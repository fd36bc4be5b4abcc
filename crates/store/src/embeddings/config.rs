//! Embedding configuration types.

use semdoc_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding configuration for a document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "hashing", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum number of texts per provider request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of batches in flight at once during ingestion
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Upper bound on a single provider call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Base URL override for HTTP providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the API credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

fn default_batch_size() -> usize {
    25
}

fn default_max_concurrency() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "hashing-v1".to_string(),
            dimensions: 384,
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
            timeout_secs: default_timeout_secs(),
            endpoint: None,
            api_key_env: None,
        }
    }
}

impl EmbeddingConfig {
    /// Reject settings no provider can work with.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config(
                "embedding.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(AppError::Config(
                "embedding.max_concurrency must be greater than zero".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config(
                "embedding.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "hashing");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_defaults_applied() {
        let yaml = "provider: openai\nmodel: text-embedding-v1\ndimensions: 1536\n";
        let config: EmbeddingConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_concurrency, 1);
        assert!(config.api_key_env.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = EmbeddingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
