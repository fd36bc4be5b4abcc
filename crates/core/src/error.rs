//! Error types for semdoc.
//!
//! This module defines a unified error enum covering the document store
//! taxonomy (empty documents, embedding failures, dimension mismatches,
//! persistence and store-integrity failures, invalid arguments) alongside the
//! ambient configuration, I/O and serialization errors.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for semdoc.
///
/// All fallible functions return `Result<T, AppError>`.
/// Expected conditions such as "no store yet" are modeled as values by the
/// callers, not as errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The document produced no fragments to index
    #[error("Document is empty: nothing to index")]
    EmptyDocument,

    /// The embedding provider could not be reached, timed out, or is misconfigured
    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Vector counts or dimensions do not line up
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Writing the index store failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// No complete index store exists at the location
    #[error("Index store not found at {0:?}")]
    StoreNotFound(PathBuf),

    /// The index store exists but cannot be parsed as a valid index
    #[error("Corrupt index store: {0}")]
    CorruptStore(String),

    /// A caller-supplied argument is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
