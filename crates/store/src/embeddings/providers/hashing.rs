//! Offline embedding provider based on feature hashing.

use crate::embeddings::provider::EmbeddingProvider;
use semdoc_core::AppResult;
use std::collections::{HashMap, HashSet};

/// Words too common to carry meaning.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Deterministic provider that needs no network.
///
/// Each content word is hashed into one dimension and each of its character
/// trigrams into further dimensions; the result is scaled to unit length. Texts
/// sharing vocabulary land close together, which is enough for local use and
/// tests, though it has no notion of synonyms.
#[derive(Debug)]
pub struct HashingProvider {
    model: String,
    dimensions: usize,
    stop_words: HashSet<&'static str>,
}

impl HashingProvider {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions: dimensions.max(1),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !self.stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for trigram in chars.windows(3) {
                let slot = self.slot(trigram.iter().collect::<String>().as_bytes(), 37);
                embedding[slot] += (*freq as f32).sqrt();
            }

            let slot = self.slot(word.as_bytes(), 31);
            embedding[slot] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }

    fn slot(&self, bytes: &[u8], multiplier: u64) -> usize {
        let hash = bytes
            .iter()
            .fold(0u64, |acc, &b| acc.wrapping_mul(multiplier).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashingProvider {
    fn provider_name(&self) -> &str {
        "hashing"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
