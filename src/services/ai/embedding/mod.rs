//! Dense embeddings and their LanceDB storage
//!
//! Split into submodules:
//! - `model`: the `Embedder` seam and the fastembed implementation
//! - `store`: LanceDB table writes and dot-product search

mod model;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use model::{l2_normalize, Embedder, FastEmbedder};
pub use store::{VectorHit, VectorTable};

// Column name constants (used by both index building and search)
pub(crate) const COLUMN_POSITION: &str = "position";
pub(crate) const COLUMN_VECTOR: &str = "vector";
pub(crate) const COLUMN_DISTANCE: &str = "_distance";
