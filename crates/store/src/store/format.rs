//! On-disk encoding of a vector index.
//!
//! `index.vec` holds the raw vectors:
//!
//! ```text
//! magic "SDVX" | version u32 LE | dimension u32 LE | count u64 LE | count * dimension f32 LE
//! ```
//!
//! `index.json` holds the manifest: dimension, count, fragment ids and texts,
//! and provenance.

use crate::types::Provenance;
use crate::vector_index::{IndexEntry, VectorIndex};
use semdoc_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const MAGIC: &[u8; 4] = b"SDVX";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Fragment record in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFragment {
    pub id: u64,
    pub text: String,
}

/// Contents of `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub dimension: usize,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    pub fragments: Vec<StoredFragment>,
}

/// Encode all vectors of an index.
pub fn encode_vectors(index: &VectorIndex) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + index.len() * index.dimension() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(index.dimension() as u32).to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());

    for entry in index.entries() {
        for &value in &entry.vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }

    bytes
}

/// Build the manifest of an index.
pub fn manifest_of(index: &VectorIndex) -> Manifest {
    Manifest {
        format_version: FORMAT_VERSION,
        dimension: index.dimension(),
        count: index.len(),
        provenance: index.provenance().cloned(),
        fragments: index
            .entries()
            .iter()
            .map(|entry| StoredFragment {
                id: entry.id,
                text: entry.text.clone(),
            })
            .collect(),
    }
}

/// Decode `index.vec` and `index.json` back into an index, validating that the
/// two artifacts agree.
pub fn decode(vector_bytes: &[u8], manifest: Manifest) -> AppResult<VectorIndex> {
    if vector_bytes.len() < HEADER_LEN {
        return Err(corrupt("vector file is shorter than its header"));
    }

    let (header, payload) = vector_bytes.split_at(HEADER_LEN);
    if &header[0..4] != MAGIC {
        return Err(corrupt("vector file has an unknown signature"));
    }

    let version = u32::from_le_bytes(read_array(&header[4..8]));
    if version != FORMAT_VERSION || manifest.format_version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported format version (vectors: {}, manifest: {})",
            version, manifest.format_version
        )));
    }

    let dimension = u32::from_le_bytes(read_array(&header[8..12])) as usize;
    let count = u64::from_le_bytes(read_array(&header[12..20])) as usize;

    if dimension != manifest.dimension || count != manifest.count {
        return Err(corrupt(format!(
            "vector file describes {} x {} but manifest describes {} x {}",
            count, dimension, manifest.count, manifest.dimension
        )));
    }

    if manifest.fragments.len() != count {
        return Err(corrupt(format!(
            "manifest lists {} fragments but declares {}",
            manifest.fragments.len(),
            count
        )));
    }

    if count > 0 && dimension == 0 {
        return Err(corrupt("non-empty index with zero dimension"));
    }

    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("vector dimensions overflow"))?;
    if payload.len() != expected_len {
        return Err(corrupt(format!(
            "vector payload is {} bytes, expected {}",
            payload.len(),
            expected_len
        )));
    }

    let mut entries = Vec::with_capacity(count);
    let mut previous_id: Option<u64> = None;

    for (fragment, raw) in manifest
        .fragments
        .into_iter()
        .zip(payload.chunks_exact((dimension * 4).max(1)))
    {
        if previous_id.is_some_and(|prev| fragment.id <= prev) {
            return Err(corrupt("fragment ids are not strictly increasing"));
        }
        previous_id = Some(fragment.id);

        let vector: Vec<f32> = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes(read_array(b)))
            .collect();

        if vector.iter().any(|v| !v.is_finite()) {
            return Err(corrupt(format!(
                "fragment {} has a non-finite vector component",
                fragment.id
            )));
        }

        entries.push(IndexEntry {
            id: fragment.id,
            text: fragment.text,
            vector,
        });
    }

    Ok(VectorIndex::from_parts(
        dimension,
        entries,
        manifest.provenance,
    ))
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn corrupt(message: impl Into<String>) -> AppError {
    AppError::CorruptStore(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VectorIndex {
        VectorIndex::build(
            vec!["alpha".to_string(), "beta".to_string()],
            vec![vec![0.5, -1.0, 2.0], vec![0.0, 0.25, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_vectors(&sample());
        assert_eq!(&bytes[0..4], b"SDVX");
        assert_eq!(bytes.len(), HEADER_LEN + 2 * 3 * 4);
    }

    #[test]
    fn test_decode_restores_index() {
        let index = sample();
        let decoded = decode(&encode_vectors(&index), manifest_of(&index)).unwrap();
        assert_eq!(decoded, index);
    }

    #[test]
    fn test_truncated_payload() {
        let index = sample();
        let mut bytes = encode_vectors(&index);
        bytes.truncate(bytes.len() - 3);

        let result = decode(&bytes, manifest_of(&index));
        assert!(matches!(result, Err(AppError::CorruptStore(_))));
    }

    #[test]
    fn test_bad_magic() {
        let index = sample();
        let mut bytes = encode_vectors(&index);
        bytes[0] = b'X';

        let result = decode(&bytes, manifest_of(&index));
        assert!(matches!(result, Err(AppError::CorruptStore(_))));
    }

    #[test]
    fn test_manifest_dimension_disagrees() {
        let index = sample();
        let mut manifest = manifest_of(&index);
        manifest.dimension = 4;

        let result = decode(&encode_vectors(&index), manifest);
        assert!(matches!(result, Err(AppError::CorruptStore(_))));
    }

    #[test]
    fn test_non_finite_component() {
        let index = VectorIndex::build(vec!["nan".to_string()], vec![vec![f32::NAN]]).unwrap();
        let result = decode(&encode_vectors(&index), manifest_of(&index));
        assert!(matches!(result, Err(AppError::CorruptStore(_))));
    }

    #[test]
    fn test_empty_index_round_trip() {
        let index = VectorIndex::default();
        let decoded = decode(&encode_vectors(&index), manifest_of(&index)).unwrap();
        assert!(decoded.is_empty());
    }
}
