mod answer;
pub(crate) mod embedding;
mod index;
mod llm;
mod normalizer;
mod search;
mod types;

pub use answer::{build_prompt, AnswerComposer};
pub use embedding::{l2_normalize, Embedder, FastEmbedder, VectorHit, VectorTable};
pub use index::{write_index, IndexBuilder, IndexManifest, IndexedFragment, MANIFEST_FILE, META_FILE, VECTORS_DIR};
pub use llm::LlmService;
pub use normalizer::{TextNormalizer, DEFAULT_EMBED_CHAR_CAP};
pub use search::{IndexArtifacts, Retriever, ScoredFragment, DEFAULT_K};
pub use types::*;
