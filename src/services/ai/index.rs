//! Similarity index construction

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::embedding::{l2_normalize, Embedder, VectorTable};
use super::normalizer::TextNormalizer;
use crate::error::{AppError, AppResult};
use crate::fragment::{read_fragments, Fragment};

pub const VECTORS_DIR: &str = "vectors.lance";
pub const META_FILE: &str = "meta.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// A fragment and its embedding, kept together so the two never drift apart
#[derive(Debug, Clone)]
pub struct IndexedFragment {
    pub vector: Vec<f32>,
    pub fragment: Fragment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub fragment_count: usize,
    pub dimension: usize,
    pub embedding_model: String,
    pub built_at: DateTime<Utc>,
}

pub struct IndexBuilder<'a, E: Embedder> {
    embedder: &'a E,
    normalizer: &'a TextNormalizer,
    batch_size: usize,
}

impl<'a, E: Embedder> IndexBuilder<'a, E> {
    pub fn new(embedder: &'a E, normalizer: &'a TextNormalizer, batch_size: usize) -> Self {
        Self {
            embedder,
            normalizer,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed every fragment whose normalized text is non-empty, in stream
    /// order. Vectors come back L2-normalized. Any embedder failure or a
    /// dimension change aborts the whole build.
    pub fn embed(&self, fragments: Vec<Fragment>) -> AppResult<Vec<IndexedFragment>> {
        let prepared: Vec<(String, Fragment)> = fragments
            .into_iter()
            .filter_map(|fragment| {
                self.normalizer
                    .prepare(&fragment.text)
                    .map(|text| (text, fragment))
            })
            .collect();

        let mut entries = Vec::with_capacity(prepared.len());
        let mut dimension: Option<usize> = None;

        for batch in prepared.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|(text, _)| text.as_str()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (mut vector, (_, fragment)) in vectors.into_iter().zip(batch) {
                let expected = *dimension.get_or_insert(vector.len());
                if vector.len() != expected {
                    return Err(AppError::Embedding(format!(
                        "embedding dimension changed from {} to {} at {}",
                        expected,
                        vector.len(),
                        fragment.citation()
                    )));
                }
                l2_normalize(&mut vector);
                entries.push(IndexedFragment {
                    vector,
                    fragment: fragment.clone(),
                });
            }
            tracing::debug!(embedded = entries.len(), total = prepared.len(), "Embedding progress");
        }

        Ok(entries)
    }

    /// Read `chunks_path`, embed it and replace the index in `out_dir`
    pub async fn build(&self, chunks_path: &Path, out_dir: &Path, table_name: &str) -> AppResult<IndexManifest> {
        let fragments = read_fragments(chunks_path)?;
        let read = fragments.len();
        let entries = self.embed(fragments)?;
        tracing::info!(read, indexed = entries.len(), "Fragments embedded");

        write_index(out_dir, table_name, self.embedder.model_name(), &entries).await
    }
}

/// Persist vectors, metadata and manifest. The manifest is written last so a
/// half-written index is never mistaken for a complete one.
pub async fn write_index(
    out_dir: &Path,
    table_name: &str,
    embedding_model: &str,
    entries: &[IndexedFragment],
) -> AppResult<IndexManifest> {
    fs::create_dir_all(out_dir)?;
    let manifest_path = out_dir.join(MANIFEST_FILE);
    if manifest_path.exists() {
        fs::remove_file(&manifest_path)?;
    }

    let vectors: Vec<&[f32]> = entries.iter().map(|entry| entry.vector.as_slice()).collect();
    VectorTable::create(&out_dir.join(VECTORS_DIR), table_name, &vectors).await?;

    let fragments: Vec<&Fragment> = entries.iter().map(|entry| &entry.fragment).collect();
    let writer = BufWriter::new(File::create(out_dir.join(META_FILE))?);
    serde_json::to_writer_pretty(writer, &fragments)?;

    let manifest = IndexManifest {
        fragment_count: entries.len(),
        dimension: entries.first().map(|entry| entry.vector.len()).unwrap_or(0),
        embedding_model: embedding_model.to_string(),
        built_at: Utc::now(),
    };
    fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;

    tracing::info!(
        fragments = manifest.fragment_count,
        dimension = manifest.dimension,
        output = %out_dir.display(),
        "Index written"
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::fragment::{FragmentKind, FragmentWriter};
    use crate::services::ai::embedding::testing::{KeywordEmbedder, LookupEmbedder};
    use crate::services::ai::normalizer::DEFAULT_EMBED_CHAR_CAP;

    fn fragment(text: &str) -> Fragment {
        Fragment::new("a.pdf", 1, FragmentKind::Text, text).unwrap()
    }

    #[test]
    fn fragments_that_normalize_to_nothing_are_skipped() {
        let normalizer = TextNormalizer::new(DEFAULT_EMBED_CHAR_CAP).unwrap();
        let builder = IndexBuilder::new(&KeywordEmbedder, &normalizer, 2);

        // a hand-edited stream can carry text that the constructor would refuse
        let blank: Fragment = serde_json::from_value(serde_json::json!({
            "doc_id": "a.pdf", "page": 1, "kind": "text", "text": " \n \n "
        }))
        .unwrap();
        let entries = builder
            .embed(vec![fragment("alpha"), blank, fragment("beta gamma"), fragment("delta")])
            .unwrap();
        let texts: Vec<_> = entries.iter().map(|e| e.fragment.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta gamma", "delta"]);
        for entry in &entries {
            let norm: f32 = entry.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn dimension_change_is_fatal() {
        let normalizer = TextNormalizer::new(DEFAULT_EMBED_CHAR_CAP).unwrap();
        let embedder = LookupEmbedder::new(&[("one", vec![1.0, 0.0]), ("two", vec![1.0, 0.0, 0.0])]);
        let builder = IndexBuilder::new(&embedder, &normalizer, 8);

        let err = builder.embed(vec![fragment("one"), fragment("two")]).unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
    }

    #[tokio::test]
    async fn embedder_failure_persists_nothing() {
        let dir = tempdir().unwrap();
        let chunks = dir.path().join("chunks.jsonl");
        let mut writer = FragmentWriter::create(&chunks).unwrap();
        writer.write(&fragment("unknown text")).unwrap();
        writer.finish().unwrap();

        let normalizer = TextNormalizer::new(DEFAULT_EMBED_CHAR_CAP).unwrap();
        let embedder = LookupEmbedder::new(&[]);
        let out = dir.path().join("index");
        let result = IndexBuilder::new(&embedder, &normalizer, 8)
            .build(&chunks, &out, "fragments")
            .await;

        assert!(result.is_err());
        assert!(!out.join(MANIFEST_FILE).exists());
        assert!(!out.join(META_FILE).exists());
    }

    #[tokio::test]
    async fn metadata_order_matches_vector_positions() {
        let dir = tempdir().unwrap();
        let normalizer = TextNormalizer::new(DEFAULT_EMBED_CHAR_CAP).unwrap();
        let builder = IndexBuilder::new(&KeywordEmbedder, &normalizer, 2);
        let entries = builder
            .embed(vec![fragment("first"), fragment("second"), fragment("third")])
            .unwrap();

        let manifest = write_index(dir.path(), "fragments", "keyword-test", &entries).await.unwrap();
        assert_eq!(manifest.fragment_count, 3);

        let meta: Vec<Fragment> =
            serde_json::from_slice(&fs::read(dir.path().join(META_FILE)).unwrap()).unwrap();
        let texts: Vec<_> = meta.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);

        let table = VectorTable::open(&dir.path().join(VECTORS_DIR), "fragments").await.unwrap();
        assert_eq!(table.count_rows().await.unwrap(), 3);
        let hits = table.search(entries[2].vector.clone(), 1).await.unwrap();
        assert_eq!(hits[0].position, 2);
    }
}
