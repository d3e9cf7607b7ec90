//! PDF extraction services
//!
//! Turns a directory of PDFs into a fragment stream:
//! - Column-aware prose lines and figure captions
//! - Tables (ruling-based lattice and whitespace-based stream detection)
//! - OCR of fixed page regions

pub mod columns;
pub mod corpus;
pub mod layout;
pub mod lines;
pub mod ocr;
pub mod page;
pub mod pdf;
pub mod tables;

pub use columns::ColumnSplitter;
pub use corpus::{CorpusExtractor, CorpusReport, DocumentReader};
pub use lines::LineAssembler;
pub use ocr::{PaddleOcr, TextRecognizer};
pub use page::{PageExtraction, PageExtractor, PageInput, PageReport, StepOutcome};
pub use pdf::PdfiumReader;

use std::path::PathBuf;

/// Default location of the Pdfium library and OCR models
pub fn default_model_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("third_party_model")
}
