//! Deterministic embedders for tests

use std::collections::HashMap;

use super::Embedder;
use crate::error::{AppError, AppResult};

pub const KEYWORD_DIM: usize = 64;

/// Hashed bag of lowercase words, so texts sharing words score higher
pub struct KeywordEmbedder;

fn bucket(word: &str) -> usize {
    let hash = word
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3));
    (hash % KEYWORD_DIM as u64) as usize
}

impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn embed_batch(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; KEYWORD_DIM];
                for word in text
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    vector[bucket(&word.to_lowercase())] += 1.0;
                }
                vector
            })
            .collect())
    }
}

/// Fixed text-to-vector table; unknown text is an error
pub struct LookupEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl LookupEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, vector)| (text.to_string(), vector.clone()))
                .collect(),
        }
    }
}

impl Embedder for LookupEmbedder {
    fn model_name(&self) -> &str {
        "lookup-test"
    }

    fn embed_batch(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                self.vectors
                    .get(*text)
                    .cloned()
                    .ok_or_else(|| AppError::Embedding(format!("no vector for {text:?}")))
            })
            .collect()
    }
}
