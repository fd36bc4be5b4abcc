//! In-memory vector index over document fragments.
//!
//! Entries are kept in insertion order and searched with an exact brute-force
//! scan. Distances are Euclidean; smaller ranks first and ties go to the entry
//! inserted first.

use crate::types::{Provenance, SearchHit};
use semdoc_core::{AppError, AppResult};
use std::cmp::Ordering;

/// A stored fragment with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Identifier assigned in insertion order, starting at 0
    pub id: u64,

    /// Fragment text
    pub text: String,

    /// Embedding vector of the index dimension
    pub vector: Vec<f32>,
}

/// Fixed-dimension collection of fragment vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
    provenance: Option<Provenance>,
}

impl VectorIndex {
    /// Build a fresh index from fragment texts and their vectors.
    ///
    /// Fails with `DimensionMismatch` if the counts differ or the vectors do not
    /// share one non-zero dimension.
    pub fn build(texts: Vec<String>, vectors: Vec<Vec<f32>>) -> AppResult<Self> {
        if texts.len() != vectors.len() {
            return Err(AppError::DimensionMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            });
        }

        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(AppError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let entries = texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(id, (text, vector))| IndexEntry {
                id: id as u64,
                text,
                vector,
            })
            .collect();

        Ok(Self {
            dimension,
            entries,
            provenance: None,
        })
    }

    /// Reassemble an index from stored entries.
    ///
    /// Used by the store when loading; entries must already be validated.
    pub(crate) fn from_parts(
        dimension: usize,
        entries: Vec<IndexEntry>,
        provenance: Option<Provenance>,
    ) -> Self {
        Self {
            dimension,
            entries,
            provenance,
        }
    }

    /// Attach provenance metadata.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Return the `k` entries closest to `query`, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (euclidean_distance(query, &entry.vector), entry))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_rank);
            scored.truncate(k);
        }
        scored.sort_by(by_rank);

        tracing::debug!(
            "Searched {} entries, returning {} (requested top-{})",
            self.entries.len(),
            scored.len(),
            k
        );

        Ok(scored
            .into_iter()
            .map(|(distance, entry)| SearchHit {
                id: entry.id,
                text: entry.text.clone(),
                distance,
            })
            .collect())
    }

    /// Vector dimension (0 for an empty index).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }
}

/// Ascending distance, then ascending id.
fn by_rank(a: &(f32, &IndexEntry), b: &(f32, &IndexEntry)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id))
}

/// Euclidean distance between two vectors of equal length.
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
