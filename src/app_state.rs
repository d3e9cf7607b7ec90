use std::path::Path;
use std::sync::Arc;

use crate::commands::AskResponse;
use crate::error::AppResult;
use crate::services::{
    AnswerComposer, AppConfig, Embedder, FastEmbedder, IndexArtifacts, LlmService, Retriever, TextNormalizer,
};
use crate::utils::{resolve_k, validate_query};

/// Everything a question needs, loaded once and shared read-only
pub struct AppState<E: Embedder> {
    pub retriever: Retriever<E>,
    pub composer: AnswerComposer,
    pub default_k: usize,
}

impl AppState<FastEmbedder> {
    pub async fn load(config: &AppConfig) -> AppResult<Arc<Self>> {
        let embedder = Arc::new(FastEmbedder::new(&config.index.embedding_model)?);
        let artifacts = IndexArtifacts::open(Path::new(&config.paths.output_dir), &config.index.table_name).await?;
        let normalizer = TextNormalizer::new(config.index.embed_char_cap)?;
        let composer = AnswerComposer::new(LlmService::new(config.generation.clone())?);

        Ok(Arc::new(Self {
            retriever: Retriever::new(embedder, normalizer, artifacts),
            composer,
            default_k: config.retrieval.default_k,
        }))
    }
}

impl<E: Embedder> AppState<E> {
    pub fn fragment_count(&self) -> usize {
        self.retriever.artifacts().len()
    }

    /// Retrieve context for `query` and answer from it
    pub async fn ask(&self, query: &str, k: Option<usize>) -> AppResult<AskResponse> {
        let query = validate_query(query)?;
        let k = resolve_k(k, self.default_k);

        let contexts = self.retriever.retrieve(query, k).await?;
        tracing::info!(k, contexts = contexts.len(), "Retrieved contexts");
        let answer = self.composer.answer(query, &contexts).await?;

        Ok(AskResponse { answer, contexts })
    }
}
