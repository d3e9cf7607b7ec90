//! Per-page fragment extraction

use image::DynamicImage;
use regex::Regex;

use super::columns::ColumnSplitter;
use super::layout::PageLayout;
use super::lines::LineAssembler;
use super::ocr::{crop_region, TextRecognizer};
use super::tables::{detectors_from_config, TableDetector};
use crate::fragment::{Fragment, FragmentKind};
use crate::services::{ExtractionConfig, OcrRegion};

/// One page as delivered by a document reader
pub struct PageInput {
    /// 1-based page number
    pub number: u32,
    pub layout: PageLayout,
    /// Rendered page for OCR; `Err` carries the reason rendering failed
    pub raster: Result<DynamicImage, String>,
}

/// Result of one optional extraction step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Produced(usize),
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct PageReport {
    pub page: u32,
    pub lines: usize,
    pub tables: Vec<(&'static str, StepOutcome)>,
    pub ocr: Vec<(String, StepOutcome)>,
}

impl PageReport {
    pub fn failures(&self) -> usize {
        self.tables
            .iter()
            .map(|(_, outcome)| outcome)
            .chain(self.ocr.iter().map(|(_, outcome)| outcome))
            .filter(|outcome| matches!(outcome, StepOutcome::Failed(_)))
            .count()
    }
}

pub struct PageExtraction {
    pub fragments: Vec<Fragment>,
    pub report: PageReport,
}

pub struct PageExtractor {
    columns: ColumnSplitter,
    lines: LineAssembler,
    detectors: Vec<Box<dyn TableDetector>>,
    ocr: Option<Box<dyn TextRecognizer>>,
    regions: Vec<OcrRegion>,
    caption: Regex,
}

impl PageExtractor {
    pub fn new(config: &ExtractionConfig, ocr: Option<Box<dyn TextRecognizer>>) -> Self {
        Self::with_detectors(config, detectors_from_config(config), ocr)
    }

    pub fn with_detectors(
        config: &ExtractionConfig,
        detectors: Vec<Box<dyn TableDetector>>,
        ocr: Option<Box<dyn TextRecognizer>>,
    ) -> Self {
        Self {
            columns: ColumnSplitter::new(config.gutter_ratio),
            lines: LineAssembler::new(config.line_tol),
            detectors,
            ocr,
            regions: if config.ocr_enabled {
                config.ocr_regions.clone()
            } else {
                Vec::new()
            },
            caption: caption_regex(),
        }
    }

    /// Left column lines, then right column lines
    pub fn reading_lines(&self, layout: &PageLayout) -> Vec<String> {
        if layout.words.is_empty() {
            return Vec::new();
        }
        let (left, right) = self.columns.split(&layout.words, layout.width);
        let mut lines = self.lines.assemble(&left);
        lines.extend(self.lines.assemble(&right));
        lines
    }

    pub fn is_caption(&self, line: &str) -> bool {
        self.caption.is_match(line)
    }

    /// Fragments come out as: text, captions, tables, OCR regions.
    pub fn extract(&self, doc_id: &str, page: &PageInput) -> PageExtraction {
        let number = page.number;
        let mut fragments = Vec::new();
        let mut report = PageReport {
            page: number,
            ..PageReport::default()
        };

        let lines = self.reading_lines(&page.layout);
        report.lines = lines.len();
        if !lines.is_empty() {
            fragments.extend(Fragment::new(doc_id, number, FragmentKind::Text, &lines.join("\n")));
            for line in lines.iter().filter(|line| self.is_caption(line)) {
                fragments.extend(Fragment::new(doc_id, number, FragmentKind::Figure, line));
            }
        }

        for detector in &self.detectors {
            let strategy = detector.strategy();
            let outcome = match detector.detect(&page.layout) {
                Ok(tables) => {
                    let before = fragments.len();
                    for table in tables {
                        let (rows, cols) = table.shape();
                        if rows == 0 || cols == 0 {
                            continue;
                        }
                        if let Some(fragment) =
                            Fragment::new(doc_id, number, FragmentKind::Table, &table.flatten())
                        {
                            fragments.push(
                                fragment
                                    .with_extra("strategy", strategy)
                                    .with_extra("rows", rows)
                                    .with_extra("cols", cols),
                            );
                        }
                    }
                    produced(fragments.len() - before)
                }
                Err(err) => {
                    tracing::warn!(doc_id, page = number, strategy, error = %err, "Table detection failed");
                    StepOutcome::Failed(err.to_string())
                }
            };
            report.tables.push((strategy, outcome));
        }

        for region in &self.regions {
            let outcome = match self.recognize_region(&page.raster, region) {
                Ok(text) => match Fragment::new(doc_id, number, FragmentKind::FigureOcr, &text) {
                    Some(fragment) => {
                        fragments.push(fragment.with_extra("region", region.name.as_str()));
                        StepOutcome::Produced(1)
                    }
                    None => StepOutcome::Empty,
                },
                Err(err) => {
                    tracing::debug!(doc_id, page = number, region = %region.name, error = %err, "OCR region skipped");
                    StepOutcome::Failed(err)
                }
            };
            report.ocr.push((region.name.clone(), outcome));
        }

        PageExtraction { fragments, report }
    }

    fn recognize_region(
        &self,
        raster: &Result<DynamicImage, String>,
        region: &OcrRegion,
    ) -> Result<String, String> {
        let ocr = self
            .ocr
            .as_ref()
            .ok_or_else(|| "ocr engine unavailable".to_string())?;
        let page = raster.as_ref().map_err(|e| e.clone())?;
        let crop = crop_region(page, region).map_err(|e| e.to_string())?;
        ocr.recognize(&crop).map_err(|e| e.to_string())
    }
}

fn produced(count: usize) -> StepOutcome {
    if count == 0 {
        StepOutcome::Empty
    } else {
        StepOutcome::Produced(count)
    }
}

fn caption_regex() -> Regex {
    // `Fig.` is followed by a non-word char, so only `figure` needs a boundary
    Regex::new(r"(?i)^\s*(figure\b|fig\.)").expect("caption pattern is valid")
}
