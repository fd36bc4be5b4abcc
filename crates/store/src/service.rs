//! Retrieval service: the façade over chunking, embedding and persistence.
//!
//! One service owns one store location. The embedding provider is created on
//! first use and shared afterwards; the persisted index is loaded once and
//! served from memory as an `Arc` snapshot until an ingest or clear replaces
//! it.

use crate::chunker;
use crate::config::{self, StoreConfig};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::store::IndexStore;
use crate::types::{IngestResult, Provenance, QueryResult, StatusReport, StoreState};
use crate::vector_index::VectorIndex;
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use semdoc_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, instrument, warn};

/// Characters shown per fragment by [`RetrievalService::search_similar`].
pub const PREVIEW_CHARS: usize = 200;

/// Builds the embedding provider on first use.
pub type ProviderFactory =
    Arc<dyn Fn() -> AppResult<Arc<dyn EmbeddingProvider>> + Send + Sync>;

/// Tuning knobs of a service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub timeout: Duration,
}

impl ServiceSettings {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            batch_size: config.embedding.batch_size,
            max_concurrency: config.embedding.max_concurrency,
            timeout: Duration::from_secs(config.embedding.timeout_secs),
        }
    }

    fn validate(&self) -> AppResult<()> {
        chunker::validate_window(self.chunk_size, self.chunk_overlap)?;
        if self.batch_size == 0 || self.max_concurrency == 0 {
            return Err(AppError::InvalidArgument(
                "batch size and concurrency must be greater than zero".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(AppError::InvalidArgument(
                "embedding timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

/// Semantic document store bound to one location.
pub struct RetrievalService {
    store: IndexStore,
    settings: ServiceSettings,
    factory: ProviderFactory,
    provider: OnceCell<Arc<dyn EmbeddingProvider>>,
    cache: RwLock<Option<Arc<VectorIndex>>>,
    /// Held by loaders and by writers while they touch the store and the cache.
    load_gate: Mutex<()>,
    /// Serializes ingest and clear.
    write_gate: Mutex<()>,
    building: AtomicBool,
    #[cfg(test)]
    disk_loads: std::sync::atomic::AtomicUsize,
}

impl std::fmt::Debug for RetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
            .field("location", &self.store.location())
            .field("settings", &self.settings)
            .field("provider", &self.provider.get())
            .finish_non_exhaustive()
    }
}

/// Clears the building flag even if the ingest future is dropped.
struct BuildingGuard<'a>(&'a AtomicBool);

impl<'a> BuildingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl RetrievalService {
    /// Create a service for `location`. Nothing is read and no provider is
    /// built until the first operation needs it.
    pub fn new(
        location: impl Into<PathBuf>,
        settings: ServiceSettings,
        factory: ProviderFactory,
    ) -> AppResult<Self> {
        settings.validate()?;

        Ok(Self {
            store: IndexStore::new(location),
            settings,
            factory,
            provider: OnceCell::new(),
            cache: RwLock::new(None),
            load_gate: Mutex::new(()),
            write_gate: Mutex::new(()),
            building: AtomicBool::new(false),
            #[cfg(test)]
            disk_loads: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    /// Create the service for a named store of a workspace.
    pub fn from_config(workspace: &Path, config: &StoreConfig) -> AppResult<Self> {
        config.validate()?;

        let embedding = config.embedding.clone();
        let factory: ProviderFactory = Arc::new(move || create_provider(&embedding));

        Self::new(
            config::get_index_location(workspace, &config.name),
            ServiceSettings::from_config(config),
            factory,
        )
    }

    pub fn location(&self) -> &Path {
        self.store.location()
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Chunk, embed and persist `text`, replacing any previous store.
    ///
    /// On failure the previously persisted store and the cached snapshot are
    /// left untouched.
    #[instrument(skip(self, text), fields(location = %self.location().display(), bytes = text.len()))]
    pub async fn ingest(&self, text: &str) -> AppResult<IngestResult> {
        let _write = self.write_gate.lock().await;
        let started = Instant::now();

        info!("Chunking document");
        let fragments =
            chunker::chunk_text(text, self.settings.chunk_size, self.settings.chunk_overlap)?;
        if fragments.is_empty() {
            return Err(AppError::EmptyDocument);
        }

        let _building = BuildingGuard::enter(&self.building);

        let provider = self.provider().await?;
        let texts: Vec<String> = fragments.into_iter().map(|f| f.text).collect();

        info!(
            "Embedding {} fragments with {}/{}",
            texts.len(),
            provider.provider_name(),
            provider.model_name()
        );
        let vectors = self.embed_all(provider.as_ref(), &texts).await?;

        let document_sha256 = sha256_hex(text);
        let document_chars = text.chars().count();
        let fragment_count = texts.len();

        let index = VectorIndex::build(texts, vectors)?.with_provenance(Provenance {
            created_at: Utc::now(),
            provider: provider.provider_name().to_string(),
            model: provider.model_name().to_string(),
            document_sha256: document_sha256.clone(),
            document_chars,
            chunk_size: self.settings.chunk_size,
            chunk_overlap: self.settings.chunk_overlap,
        });
        let index = Arc::new(index);
        let dimension = index.dimension();

        {
            let _load = self.load_gate.lock().await;

            info!("Saving index to {}", self.location().display());
            let store = self.store.clone();
            let snapshot = Arc::clone(&index);
            run_blocking(move || store.save(&snapshot)).await?;

            *self.cache.write().await = Some(index);
        }

        let duration = started.elapsed();
        info!(
            "Ingested {} fragments (dimension {}) in {:.2}s",
            fragment_count,
            dimension,
            duration.as_secs_f64()
        );

        Ok(IngestResult {
            fragment_count,
            dimension,
            document_chars,
            document_sha256,
            duration_secs: duration.as_secs_f64(),
        })
    }

    /// Return the `top_k` fragments closest to `question`.
    ///
    /// A location without a store yields [`QueryResult::NotReady`] without
    /// contacting the embedding provider.
    #[instrument(skip(self, question), fields(location = %self.location().display()))]
    pub async fn query(&self, question: &str, top_k: usize) -> AppResult<QueryResult> {
        if top_k == 0 {
            return Err(AppError::InvalidArgument(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if question.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "question must not be empty".to_string(),
            ));
        }

        let Some(index) = self.snapshot().await? else {
            debug!("No store at {}", self.location().display());
            return Ok(QueryResult::NotReady);
        };

        let provider = self.provider().await?;
        warn_on_provenance_mismatch(&index, provider.as_ref());

        let mut vectors = self
            .embed_with_timeout(provider.as_ref(), &[question.to_string()])
            .await?;
        let query = vectors.pop().ok_or_else(|| {
            AppError::EmbeddingUnavailable("provider returned no embedding".to_string())
        })?;

        let hits = index.search(&query, top_k)?;
        debug!("Query matched {} fragments", hits.len());

        Ok(QueryResult::Found(hits))
    }

    /// Like [`query`](Self::query), rendered as a numbered preview listing.
    pub async fn search_similar(&self, question: &str, top_k: usize) -> AppResult<String> {
        let result = self.query(question, top_k).await?;
        Ok(result.render_listing(PREVIEW_CHARS))
    }

    /// Report the lifecycle state and artifact sizes. Never builds the provider.
    pub async fn status(&self) -> AppResult<StatusReport> {
        let store = self.store.clone();
        let (exists, artifacts) =
            run_blocking(move || Ok((store.exists(), store.size_report()))).await?;

        let state = if self.building.load(Ordering::SeqCst) {
            StoreState::Building
        } else if exists {
            StoreState::Ready
        } else {
            StoreState::Empty
        };

        Ok(StatusReport {
            state,
            exists,
            artifacts,
        })
    }

    /// Erase the store and drop the cached snapshot. Returns whether anything
    /// was on disk.
    #[instrument(skip(self), fields(location = %self.location().display()))]
    pub async fn clear(&self) -> AppResult<bool> {
        let _write = self.write_gate.lock().await;
        let _load = self.load_gate.lock().await;

        let store = self.store.clone();
        let existed = run_blocking(move || {
            let existed = store.location().exists();
            store.clear()?;
            Ok(existed)
        })
        .await?;

        *self.cache.write().await = None;

        info!("Store cleared");
        Ok(existed)
    }

    /// Number of times the index was read from disk.
    #[cfg(test)]
    pub(crate) fn disk_loads(&self) -> usize {
        self.disk_loads.load(Ordering::SeqCst)
    }

    /// Shared provider, built through the factory exactly once.
    async fn provider(&self) -> AppResult<Arc<dyn EmbeddingProvider>> {
        let provider = self
            .provider
            .get_or_try_init(|| async {
                info!("Initializing embedding provider");
                (self.factory)()
            })
            .await?;
        Ok(Arc::clone(provider))
    }

    /// Current index snapshot, loading it from disk on a cache miss.
    async fn snapshot(&self) -> AppResult<Option<Arc<VectorIndex>>> {
        if let Some(index) = self.cache.read().await.as_ref() {
            return Ok(Some(Arc::clone(index)));
        }

        let _load = self.load_gate.lock().await;

        // Another task may have loaded it while we waited.
        if let Some(index) = self.cache.read().await.as_ref() {
            return Ok(Some(Arc::clone(index)));
        }

        let store = self.store.clone();
        match run_blocking(move || store.load()).await {
            Ok(index) => {
                #[cfg(test)]
                self.disk_loads.fetch_add(1, Ordering::SeqCst);

                info!(
                    "Loaded index with {} fragments from {}",
                    index.len(),
                    self.location().display()
                );
                let index = Arc::new(index);
                *self.cache.write().await = Some(Arc::clone(&index));
                Ok(Some(index))
            }
            Err(AppError::StoreNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn embed_all(
        &self,
        provider: &dyn EmbeddingProvider,
        texts: &[String],
    ) -> AppResult<Vec<Vec<f32>>> {
        // Owned batches keep the ingest future free of borrows into `texts`,
        // so callers can hand it to `tokio::spawn`.
        let batches: Vec<Vec<String>> = texts
            .chunks(self.settings.batch_size)
            .map(<[String]>::to_vec)
            .collect();

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(batches)
            .map(move |batch: Vec<String>| async move {
                self.embed_with_timeout(provider, &batch).await
            })
            .buffered(self.settings.max_concurrency)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    async fn embed_with_timeout(
        &self,
        provider: &dyn EmbeddingProvider,
        texts: &[String],
    ) -> AppResult<Vec<Vec<f32>>> {
        let vectors = tokio::time::timeout(self.settings.timeout, provider.embed_batch(texts))
            .await
            .map_err(|_| {
                AppError::EmbeddingUnavailable(format!(
                    "{} did not respond within {:?}",
                    provider.provider_name(),
                    self.settings.timeout
                ))
            })??;

        if vectors.len() != texts.len() {
            return Err(AppError::EmbeddingUnavailable(format!(
                "{} returned {} embeddings for {} texts",
                provider.provider_name(),
                vectors.len(),
                texts.len()
            )));
        }

        Ok(vectors)
    }
}

fn warn_on_provenance_mismatch(index: &VectorIndex, provider: &dyn EmbeddingProvider) {
    if let Some(provenance) = index.provenance() {
        if provenance.provider != provider.provider_name()
            || provenance.model != provider.model_name()
        {
            warn!(
                "Index was built with {}/{} but queries use {}/{}; re-ingest to get meaningful results",
                provenance.provider,
                provenance.model,
                provider.provider_name(),
                provider.model_name()
            );
        }
    }
}

/// Run synchronous store I/O off the async workers.
async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Other(format!("Blocking task failed: {}", e)))?
}

fn sha256_hex(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
