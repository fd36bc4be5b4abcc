//! Stub embedding providers and service builders for scenario tests.

use crate::embeddings::EmbeddingProvider;
use crate::service::{ProviderFactory, RetrievalService, ServiceSettings};
use async_trait::async_trait;
use semdoc_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Returns a fixed vector per known text.
#[derive(Debug, Clone)]
pub struct FixedProvider {
    vectors: HashMap<String, Vec<f32>>,
    dimensions: usize,
}

impl FixedProvider {
    pub fn new(pairs: Vec<(&str, Vec<f32>)>) -> Self {
        let dimensions = pairs.first().map(|(_, v)| v.len()).unwrap_or(1);
        Self {
            vectors: pairs
                .into_iter()
                .map(|(text, vector)| (text.to_string(), vector))
                .collect(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedProvider {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        "fixed-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                self.vectors.get(text).cloned().ok_or_else(|| {
                    AppError::EmbeddingUnavailable(format!("no vector for {:?}", text))
                })
            })
            .collect()
    }
}

/// Always fails as an unreachable service would.
#[derive(Debug)]
pub struct DownProvider;

#[async_trait]
impl EmbeddingProvider for DownProvider {
    fn provider_name(&self) -> &str {
        "down"
    }

    fn model_name(&self) -> &str {
        "down-v1"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::EmbeddingUnavailable(
            "connection refused".to_string(),
        ))
    }
}

/// Never answers within any reasonable timeout.
#[derive(Debug)]
pub struct StalledProvider;

#[async_trait]
impl EmbeddingProvider for StalledProvider {
    fn provider_name(&self) -> &str {
        "stalled"
    }

    fn model_name(&self) -> &str {
        "stalled-v1"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(vec![vec![0.0, 0.0]; texts.len()])
    }
}

/// Signals when a batch arrives and waits for permission to answer.
#[derive(Debug, Default)]
pub struct GatedProvider {
    pub started: Notify,
    pub release: Notify,
}

#[async_trait]
impl EmbeddingProvider for GatedProvider {
    fn provider_name(&self) -> &str {
        "gated"
    }

    fn model_name(&self) -> &str {
        "gated-v1"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(vec![vec![1.0, 0.0]; texts.len()])
    }
}

/// Factory handing out `provider` and counting how often it was invoked.
pub fn counting_factory(provider: Arc<dyn EmbeddingProvider>) -> (ProviderFactory, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let factory: ProviderFactory = Arc::new(move || -> AppResult<Arc<dyn EmbeddingProvider>> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&provider))
    });
    (factory, count)
}

/// Four-character fragments, no overlap, small batches.
pub fn small_settings() -> ServiceSettings {
    ServiceSettings {
        chunk_size: 4,
        chunk_overlap: 0,
        batch_size: 2,
        max_concurrency: 2,
        timeout: Duration::from_secs(5),
    }
}

pub fn service_with(
    location: &Path,
    provider: Arc<dyn EmbeddingProvider>,
) -> (RetrievalService, Arc<AtomicUsize>) {
    let (factory, count) = counting_factory(provider);
    let service = RetrievalService::new(location, small_settings(), factory).unwrap();
    (service, count)
}

/// Vectors for the three-fragment document `"aaaabbbbcccc"` and the query `"q"`.
pub fn scenario_a_provider() -> Arc<dyn EmbeddingProvider> {
    Arc::new(FixedProvider::new(vec![
        ("aaaa", vec![1.0, 0.0]),
        ("bbbb", vec![0.0, 1.0]),
        ("cccc", vec![1.0, 1.0]),
        ("q", vec![1.0, 0.1]),
        ("dddd", vec![0.0, 0.0]),
        ("eeee", vec![5.0, 5.0]),
    ]))
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
