//! Fragment records and the JSONL fragment stream

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Text,
    Table,
    Figure,
    FigureOcr,
}

impl FragmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentKind::Text => "text",
            FragmentKind::Table => "table",
            FragmentKind::Figure => "figure",
            FragmentKind::FigureOcr => "figure_ocr",
        }
    }
}

/// One typed, attributable unit of extracted document text.
///
/// `text` is always trimmed and never empty: the only constructor refuses
/// blank input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub doc_id: String,
    pub page: u32,
    pub kind: FragmentKind,
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Fragment {
    pub fn new(doc_id: impl Into<String>, page: u32, kind: FragmentKind, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            doc_id: doc_id.into(),
            page,
            kind,
            text: text.to_string(),
            extra: Map::new(),
        })
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Citation tag as it appears in answers, e.g. `paper.pdf p.3`
    pub fn citation(&self) -> String {
        format!("{} p.{}", self.doc_id, self.page)
    }
}

/// Append-only writer for the fragment stream (one JSON object per line)
pub struct FragmentWriter {
    inner: BufWriter<File>,
    written: usize,
}

impl FragmentWriter {
    /// Create (or truncate) the stream file
    pub fn create(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            inner: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write(&mut self, fragment: &Fragment) -> AppResult<()> {
        serde_json::to_writer(&mut self.inner, fragment)?;
        self.inner.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> AppResult<usize> {
        self.inner.flush()?;
        Ok(self.written)
    }
}

/// Read every fragment from a JSONL stream. Blank lines are skipped; unknown
/// fields are kept in `extra`.
pub fn read_fragments(path: &Path) -> AppResult<Vec<Fragment>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut fragments = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fragment: Fragment = serde_json::from_str(&line).map_err(|e| {
            AppError::Validation(format!(
                "{} line {}: invalid fragment: {}",
                path.display(),
                index + 1,
                e
            ))
        })?;
        fragments.push(fragment);
    }

    Ok(fragments)
}
