//! LanceDB storage operations

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use arrow_array::builder::{FixedSizeListBuilder, Float32Builder};
use arrow_array::{Float32Array, Int64Array, RecordBatch, RecordBatchIterator};
use arrow_schema::{DataType, Field, Schema};
use futures_util::TryStreamExt;
use lancedb::arrow::SendableRecordBatchStream;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Error as LanceError, Table};

use super::{COLUMN_DISTANCE, COLUMN_POSITION, COLUMN_VECTOR};
use crate::error::{AppError, AppResult, ResultExt};

/// One nearest-neighbour match: the row's position in the metadata array and
/// its dot-product similarity to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorHit {
    pub position: usize,
    pub score: f32,
}

/// The vector half of the index. `table` is `None` for an empty corpus.
pub struct VectorTable {
    table: Option<Table>,
}

fn dataset_uri(dir: &Path) -> AppResult<&str> {
    dir.to_str()
        .ok_or_else(|| AppError::Index(format!("index path is not UTF-8: {}", dir.display())))
}

async fn connect_dir(dir: &Path) -> AppResult<Connection> {
    connect(dataset_uri(dir)?)
        .execute()
        .await
        .index_err("connect lancedb")
}

pub fn build_schema(dim: usize) -> AppResult<Arc<Schema>> {
    let dim = i32::try_from(dim).map_err(|_| AppError::Index("vector dimension overflow".to_string()))?;
    let vector = DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim);

    Ok(Arc::new(Schema::new(vec![
        Field::new(COLUMN_POSITION, DataType::Int64, false),
        Field::new(COLUMN_VECTOR, vector, true),
    ])))
}

pub fn build_record_batch(schema: Arc<Schema>, vectors: &[&[f32]], dim: usize) -> AppResult<RecordBatch> {
    let positions = Int64Array::from_iter_values(0..vectors.len() as i64);

    let mut builder = FixedSizeListBuilder::with_capacity(
        Float32Builder::with_capacity(vectors.len() * dim),
        dim as i32,
        vectors.len(),
    );
    for vector in vectors {
        if vector.len() != dim {
            return Err(AppError::Index("embedding vector size mismatch".to_string()));
        }
        builder.values().append_slice(vector);
        builder.append(true);
    }
    let vectors = builder.finish();

    RecordBatch::try_new(schema, vec![Arc::new(positions), Arc::new(vectors)]).index_err("build record batch")
}

impl VectorTable {
    /// Replace whatever is at `dir` with a fresh table holding `vectors`,
    /// row `i` tagged with position `i`.
    pub async fn create(dir: &Path, name: &str, vectors: &[&[f32]]) -> AppResult<Self> {
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;

        let Some(first) = vectors.first() else {
            return Ok(Self { table: None });
        };
        let dim = first.len();

        let schema = build_schema(dim)?;
        let batch = build_record_batch(schema.clone(), vectors, dim)?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let db = connect_dir(dir).await?;
        let table = db
            .create_table(name, batches)
            .execute()
            .await
            .index_err("create vector table")?;

        tracing::debug!(rows = vectors.len(), dim, "Vector table written");
        Ok(Self { table: Some(table) })
    }

    pub async fn open(dir: &Path, name: &str) -> AppResult<Self> {
        if !dir.is_dir() {
            return Err(AppError::Index(format!("vector store not found: {}", dir.display())));
        }

        let db = connect_dir(dir).await?;
        match db.open_table(name).execute().await {
            Ok(table) => Ok(Self { table: Some(table) }),
            Err(LanceError::TableNotFound { .. }) => Ok(Self { table: None }),
            Err(err) => Err(AppError::Index(format!("open vector table: {}", err))),
        }
    }

    pub async fn count_rows(&self) -> AppResult<usize> {
        match &self.table {
            Some(table) => table.count_rows(None).await.index_err("count vector rows"),
            None => Ok(0),
        }
    }

    /// Exact top-`k` search by inner product
    pub async fn search(&self, query: Vec<f32>, k: usize) -> AppResult<Vec<VectorHit>> {
        let Some(table) = &self.table else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let stream = table
            .query()
            .nearest_to(query)
            .retrieval_err("build vector query")?
            .column(COLUMN_VECTOR)
            .distance_type(DistanceType::Dot)
            .limit(k)
            .execute()
            .await
            .retrieval_err("vector search")?;

        let mut hits = collect_hits(stream).await?;
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}

async fn collect_hits(mut stream: SendableRecordBatchStream) -> AppResult<Vec<VectorHit>> {
    let mut hits = Vec::new();

    while let Some(batch) = stream.try_next().await.retrieval_err("read search results")? {
        if batch.num_rows() == 0 {
            continue;
        }

        let positions = batch
            .column_by_name(COLUMN_POSITION)
            .ok_or_else(|| AppError::Retrieval("search result missing position".to_string()))?
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| AppError::Retrieval("position column type mismatch".to_string()))?;
        let distances = batch
            .column_by_name(COLUMN_DISTANCE)
            .ok_or_else(|| AppError::Retrieval("search result missing distance".to_string()))?
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| AppError::Retrieval("distance column type mismatch".to_string()))?;

        for row_idx in 0..batch.num_rows() {
            let position = usize::try_from(positions.value(row_idx))
                .map_err(|_| AppError::Retrieval("negative position in vector table".to_string()))?;
            // lance reports dot distance as 1 - dot
            let score = 1.0 - distances.value(row_idx);
            hits.push(VectorHit { position, score });
        }
    }

    Ok(hits)
}
