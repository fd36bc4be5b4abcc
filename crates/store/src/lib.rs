//! Semantic document store.
//!
//! Splits document text into overlapping fragments, embeds them, persists the
//! resulting vector index and answers nearest-neighbor queries against it.
//! [`RetrievalService`] is the entry point; the other modules are its parts.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod registry;
pub mod service;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::StoreConfig;
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use registry::ServiceRegistry;
pub use service::{ProviderFactory, RetrievalService, ServiceSettings};
pub use store::IndexStore;
pub use types::{
    Fragment, IngestResult, Provenance, QueryResult, SearchHit, StatusReport, StoreState,
};
pub use vector_index::VectorIndex;
