//! Embedder seam and the fastembed-backed implementation

use std::sync::Mutex;

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};

use crate::error::{AppError, AppResult, ResultExt};

/// Turns text into dense vectors. Implementations must return exactly one
/// vector per input, in input order.
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    fn embed_batch(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("embedder returned no vector".to_string()))
    }
}

pub struct FastEmbedder {
    model_name: String,
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    pub fn new(model_name: &str) -> AppResult<Self> {
        let model: EmbeddingModel = model_name.parse::<EmbeddingModel>().config_err("embedding model")?;
        let embedding = TextEmbedding::try_new(TextInitOptions::new(model)).embedding_err("load embedding model")?;

        tracing::info!(model = %model_name, "Embedding model loaded");
        Ok(Self {
            model_name: model_name.to_string(),
            model: Mutex::new(embedding),
        })
    }
}

impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn embed_batch(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = {
            let mut model = self
                .model
                .lock()
                .map_err(|_| AppError::Embedding("embedding model lock poisoned".to_string()))?;
            model.embed(texts, None)
        }
        .embedding_err("embed")?;

        if vectors.len() != texts.len() {
            return Err(AppError::Embedding("embedding result count mismatch".to_string()));
        }
        Ok(vectors)
    }
}

/// Scale `vector` to unit length in place. A zero vector stays zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}
