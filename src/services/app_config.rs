//! Pipeline configuration
//!
//! Every tunable the extraction, indexing and serving stages use lives here
//! and is handed to component constructors explicitly.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::ai::{DEFAULT_EMBED_CHAR_CAP, DEFAULT_K};
use super::parser::columns::DEFAULT_GUTTER_RATIO;
use super::parser::lines::DEFAULT_LINE_TOL;
use crate::error::{AppResult, ResultExt};

pub const BEDROCK_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// A page region given as fractions of the page width/height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRegion {
    pub name: String,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl OcrRegion {
    pub fn new(name: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            name: name.to_string(),
            x0,
            y0,
            x1,
            y1,
        }
    }

    pub fn caption_band() -> Self {
        Self::new("caption_band", 0.0, 0.70, 1.0, 1.0)
    }

    pub fn diagram_band() -> Self {
        Self::new("diagram_band", 0.15, 0.30, 0.85, 0.70)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub gutter_ratio: f32,
    pub line_tol: f32,
    /// Max horizontal gap between glyphs of one word, in points
    pub word_gap_tol: f32,
    /// Max thickness of a path object treated as a ruling line
    pub ruling_tol: f32,
    /// Min gap between words that separates two stream-table cells
    pub stream_cell_gap: f32,
    pub stream_min_cols: usize,
    pub stream_min_rows: usize,
    pub table_strategies: Vec<String>,
    pub ocr_enabled: bool,
    pub ocr_dpi: u32,
    pub ocr_regions: Vec<OcrRegion>,
    pub model_dir: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            gutter_ratio: DEFAULT_GUTTER_RATIO,
            line_tol: DEFAULT_LINE_TOL,
            word_gap_tol: 3.0,
            ruling_tol: 2.0,
            stream_cell_gap: 12.0,
            stream_min_cols: 3,
            stream_min_rows: 2,
            table_strategies: vec!["lattice".to_string(), "stream".to_string()],
            ocr_enabled: true,
            ocr_dpi: 200,
            ocr_regions: vec![OcrRegion::caption_band(), OcrRegion::diagram_band()],
            model_dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub embedding_model: String,
    pub embed_char_cap: usize,
    pub embed_batch_size: usize,
    pub table_name: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            embedding_model: "Xenova/bge-small-en-v1.5".to_string(),
            embed_char_cap: DEFAULT_EMBED_CHAR_CAP,
            embed_batch_size: 32,
            table_name: "fragments".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_k: DEFAULT_K }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of the runtime endpoint; derived from `region` when empty
    pub endpoint: String,
    pub region: String,
    pub model_id: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: "us-east-2".to_string(),
            model_id: "anthropic.claude-sonnet-4-5-20250929-v1:0".to_string(),
            api_key: String::new(),
            max_tokens: 600,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub docs_dir: String,
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            docs_dir: "./docs".to_string(),
            output_dir: "./outputs".to_string(),
        }
    }
}

impl PathsConfig {
    pub fn chunks_path(&self) -> PathBuf {
        Path::new(&self.output_dir).join("chunks.jsonl")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub paths: PathsConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load from an explicit path, else the per-user config file, else defaults
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(&path)
                    .config_err(&format!("read {}", path.display()))?;
                tracing::info!(path = %path.display(), "Loaded config");
                serde_json::from_str::<AppConfig>(&raw)
                    .config_err(&format!("parse {}", path.display()))?
            }
            None => AppConfig::default(),
        };

        if let Ok(token) = std::env::var(BEDROCK_TOKEN_ENV) {
            config.generation.api_key = token;
        }
        config.apply_defaults();
        Ok(config)
    }

    fn apply_defaults(&mut self) {
        if self.extraction.model_dir.trim().is_empty() {
            self.extraction.model_dir = super::parser::default_model_dir()
                .to_string_lossy()
                .to_string();
        }
        if self.generation.endpoint.trim().is_empty() {
            self.generation.endpoint =
                format!("https://bedrock-runtime.{}.amazonaws.com", self.generation.region);
        }
        if self.retrieval.default_k == 0 {
            self.retrieval.default_k = RetrievalConfig::default().default_k;
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "docrag").map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.extraction.gutter_ratio, 0.08);
        assert_eq!(config.extraction.line_tol, 3.0);
        assert_eq!(config.index.embed_char_cap, 4000);
        assert_eq!(config.retrieval.default_k, 8);
        assert_eq!(config.extraction.ocr_regions.len(), 2);
        assert_eq!(config.extraction.ocr_regions[0], OcrRegion::caption_band());
    }

    #[test]
    fn defaults_share_component_constants() {
        let config = AppConfig::default();
        assert_eq!(config.extraction.gutter_ratio, DEFAULT_GUTTER_RATIO);
        assert_eq!(config.extraction.line_tol, DEFAULT_LINE_TOL);
        assert_eq!(config.index.embed_char_cap, DEFAULT_EMBED_CHAR_CAP);
        assert_eq!(config.retrieval.default_k, DEFAULT_K);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"extraction": {"gutter_ratio": 0.1}, "generation": {"region": "eu-west-1"}}"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.extraction.gutter_ratio, 0.1);
        assert_eq!(config.extraction.line_tol, 3.0);
        assert_eq!(
            config.generation.endpoint,
            "https://bedrock-runtime.eu-west-1.amazonaws.com"
        );
        assert!(!config.extraction.model_dir.is_empty());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, crate::AppError::Config(_)));
    }
}
