//! Document store type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bounded, overlapping substring of an ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Position within the document (0-based)
    pub position: usize,

    /// Offset of the first character, counted in characters
    pub start: usize,

    /// Exact text of the window
    pub text: String,
}

/// Where an index came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// When the index was built
    pub created_at: DateTime<Utc>,

    /// Embedding provider name
    pub provider: String,

    /// Embedding model name
    pub model: String,

    /// Hex SHA-256 of the ingested document
    pub document_sha256: String,

    /// Length of the ingested document in characters
    pub document_chars: usize,

    /// Chunk window size used
    pub chunk_size: usize,

    /// Chunk overlap used
    pub chunk_overlap: usize,
}

/// One ranked result of a nearest-neighbor search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Internal fragment identifier (insertion order)
    pub id: u64,

    /// Fragment text
    pub text: String,

    /// Euclidean distance to the query vector (smaller is closer)
    pub distance: f32,
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    /// Number of fragments indexed
    pub fragment_count: usize,

    /// Embedding dimension of the new index
    pub dimension: usize,

    /// Length of the document in characters
    pub document_chars: usize,

    /// Hex SHA-256 of the document
    pub document_sha256: String,

    /// Wall-clock duration in seconds
    pub duration_secs: f64,
}

/// Outcome of a query.
///
/// A missing store is an expected condition and is reported as
/// [`QueryResult::NotReady`] instead of an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "hits", rename_all = "snake_case")]
pub enum QueryResult {
    /// No document has been ingested at this location yet
    NotReady,

    /// Ranked fragments, closest first
    Found(Vec<SearchHit>),
}

impl QueryResult {
    /// Whether the store was ready to answer.
    pub fn is_ready(&self) -> bool {
        matches!(self, QueryResult::Found(_))
    }

    /// Ranked hits, empty when not ready.
    pub fn hits(&self) -> &[SearchHit] {
        match self {
            QueryResult::NotReady => &[],
            QueryResult::Found(hits) => hits,
        }
    }

    /// Render the hits as context text for a downstream consumer.
    pub fn render_context(&self) -> String {
        match self {
            QueryResult::NotReady => NOT_READY_MESSAGE.to_string(),
            QueryResult::Found(hits) if hits.is_empty() => {
                "No relevant content found in the document.".to_string()
            }
            QueryResult::Found(hits) => {
                let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
                format!("Relevant document content:\n\n{}", texts.join("\n\n"))
            }
        }
    }

    /// Render the hits as a numbered listing, each cut to `preview_chars`.
    pub fn render_listing(&self, preview_chars: usize) -> String {
        let hits = match self {
            QueryResult::NotReady => return NOT_READY_MESSAGE.to_string(),
            QueryResult::Found(hits) if hits.is_empty() => {
                return "No similar content found.".to_string()
            }
            QueryResult::Found(hits) => hits,
        };

        let mut out = format!("Found {} similar fragments:\n", hits.len());
        for (i, hit) in hits.iter().enumerate() {
            let mut preview: String = hit.text.chars().take(preview_chars).collect();
            if hit.text.chars().count() > preview_chars {
                preview.push_str("...");
            }
            out.push_str(&format!(
                "\n{}. (distance {:.4}) {}\n",
                i + 1,
                hit.distance,
                preview
            ));
        }
        out
    }
}

const NOT_READY_MESSAGE: &str = "No document has been ingested yet. Ingest a document first.";

/// Lifecycle state of a store location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    /// Nothing persisted
    Empty,
    /// An ingestion is in progress (a previous store may still be served)
    Building,
    /// A complete store is persisted
    Ready,
}

/// Status of a store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    /// Lifecycle state
    pub state: StoreState,

    /// Whether a complete store exists on disk
    pub exists: bool,

    /// Artifact name to size in bytes
    pub artifacts: BTreeMap<String, u64>,
}

impl StatusReport {
    /// Total size of all artifacts in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.artifacts.values().sum()
    }
}
