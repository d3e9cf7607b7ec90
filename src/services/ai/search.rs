//! Query-time retrieval over a built index

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::embedding::{l2_normalize, Embedder, VectorTable};
use super::index::{IndexManifest, MANIFEST_FILE, META_FILE, VECTORS_DIR};
use super::normalizer::TextNormalizer;
use crate::error::{AppError, AppResult, ResultExt};
use crate::fragment::Fragment;

/// Fragments retrieved per question when the caller gives no `k`
pub const DEFAULT_K: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredFragment {
    #[serde(flatten)]
    pub fragment: Fragment,
    pub score: f32,
}

/// Manifest, metadata and vector table of one index, checked for consistency
pub struct IndexArtifacts {
    manifest: IndexManifest,
    fragments: Vec<Fragment>,
    table: VectorTable,
}

impl IndexArtifacts {
    pub async fn open(dir: &Path, table_name: &str) -> AppResult<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest: IndexManifest = serde_json::from_slice(
            &fs::read(&manifest_path).index_err(&format!("read {}", manifest_path.display()))?,
        )?;
        let fragments: Vec<Fragment> = serde_json::from_slice(
            &fs::read(dir.join(META_FILE)).index_err("read index metadata")?,
        )?;
        let table = VectorTable::open(&dir.join(VECTORS_DIR), table_name).await?;
        let rows = table.count_rows().await?;

        if fragments.len() != manifest.fragment_count || rows != manifest.fragment_count {
            return Err(AppError::Index(format!(
                "index is inconsistent: manifest {} fragments, metadata {}, vectors {}",
                manifest.fragment_count,
                fragments.len(),
                rows
            )));
        }

        tracing::info!(
            fragments = manifest.fragment_count,
            model = %manifest.embedding_model,
            built_at = %manifest.built_at,
            "Index loaded"
        );
        Ok(Self {
            manifest,
            fragments,
            table,
        })
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

pub struct Retriever<E: Embedder> {
    embedder: Arc<E>,
    normalizer: TextNormalizer,
    artifacts: IndexArtifacts,
}

impl<E: Embedder> Retriever<E> {
    pub fn new(embedder: Arc<E>, normalizer: TextNormalizer, artifacts: IndexArtifacts) -> Self {
        if !artifacts.is_empty() && artifacts.manifest.embedding_model != embedder.model_name() {
            tracing::warn!(
                index_model = %artifacts.manifest.embedding_model,
                query_model = %embedder.model_name(),
                "Index was built with a different embedding model"
            );
        }
        Self {
            embedder,
            normalizer,
            artifacts,
        }
    }

    pub fn artifacts(&self) -> &IndexArtifacts {
        &self.artifacts
    }

    /// Top-`k` fragments by cosine similarity to `query`, best first
    pub async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<ScoredFragment>> {
        let text = self
            .normalizer
            .prepare(query)
            .ok_or_else(|| AppError::Validation("query required".to_string()))?;
        if k == 0 || self.artifacts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vector = self.embedder.embed_one(&text).retrieval_err("embed query")?;
        if vector.len() != self.artifacts.manifest.dimension {
            return Err(AppError::Retrieval(format!(
                "query dimension {} does not match index dimension {}",
                vector.len(),
                self.artifacts.manifest.dimension
            )));
        }
        l2_normalize(&mut vector);

        let hits = self.artifacts.table.search(vector, k).await?;
        hits.into_iter()
            .map(|hit| {
                let fragment = self.artifacts.fragments.get(hit.position).ok_or_else(|| {
                    AppError::Retrieval(format!("vector row {} has no metadata entry", hit.position))
                })?;
                Ok(ScoredFragment {
                    fragment: fragment.clone(),
                    score: hit.score,
                })
            })
            .collect()
    }
}
