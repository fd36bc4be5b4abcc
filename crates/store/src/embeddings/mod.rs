//! Embedding providers.
//!
//! The store only depends on the [`EmbeddingProvider`] trait; concrete
//! providers are picked from configuration by [`create_provider`].

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
