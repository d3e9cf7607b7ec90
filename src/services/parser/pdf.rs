//! PDF page reading backed by Pdfium

use std::path::Path;

use image::DynamicImage;
use pdfium_render::prelude::*;

use super::corpus::DocumentReader;
use super::layout::{words_from_glyphs, Glyph, PageLayout, Ruling};
use super::page::PageInput;
use crate::error::{AppError, AppResult, ResultExt};
use crate::services::ExtractionConfig;

/// Bind Pdfium from the model directory, falling back to the system library
fn build_pdfium(model_dir: &Path) -> AppResult<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(model_dir))
        .or_else(|_| Pdfium::bind_to_system_library())
        .config_err("bind pdfium")?;

    Ok(Pdfium::new(bindings))
}

pub struct PdfiumReader {
    pdfium: Pdfium,
    word_gap_tol: f32,
    ruling_tol: f32,
    render_dpi: Option<u32>,
}

impl PdfiumReader {
    /// `ocr_available` is false when the recognizer failed to load; pages are
    /// then never rasterized.
    pub fn new(config: &ExtractionConfig, ocr_available: bool) -> AppResult<Self> {
        let pdfium = build_pdfium(Path::new(&config.model_dir))?;
        Ok(Self {
            pdfium,
            word_gap_tol: config.word_gap_tol,
            ruling_tol: config.ruling_tol,
            render_dpi: render_dpi(config, ocr_available),
        })
    }

    fn page_input(&self, number: u32, page: &PdfPage) -> AppResult<PageInput> {
        let width = page.width().value;
        let height = page.height().value;

        let text = page.text().pdf_err("read page text")?;
        let glyphs: Vec<Glyph> = text
            .chars()
            .iter()
            .filter_map(|ch| {
                let c = ch.unicode_char()?;
                let rect = ch.loose_bounds().ok()?;
                Some(Glyph {
                    ch: c,
                    x0: rect.left().value,
                    x1: rect.right().value,
                    top: height - rect.top().value,
                    bottom: height - rect.bottom().value,
                })
            })
            .collect();
        let words = words_from_glyphs(glyphs, self.word_gap_tol);

        let rulings = page
            .objects()
            .iter()
            .filter(|object| object.object_type() == PdfPageObjectType::Path)
            .filter_map(|object| object.bounds().ok())
            .flat_map(|bounds| {
                Ruling::from_box(
                    bounds.left().value,
                    height - bounds.top().value,
                    bounds.right().value,
                    height - bounds.bottom().value,
                    self.ruling_tol,
                )
            })
            .collect();

        let raster = match self.render_dpi {
            Some(dpi) => render_page(page, dpi),
            None => Err("page rendering disabled".to_string()),
        };

        Ok(PageInput {
            number,
            layout: PageLayout {
                width,
                height,
                words,
                rulings,
            },
            raster,
        })
    }
}

fn render_dpi(config: &ExtractionConfig, ocr_available: bool) -> Option<u32> {
    (config.ocr_enabled && ocr_available).then_some(config.ocr_dpi)
}

fn render_page(page: &PdfPage, dpi: u32) -> Result<DynamicImage, String> {
    let config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
    page.render_with_config(&config)
        .map(|bitmap| bitmap.as_image())
        .map_err(|e| e.to_string())
}

impl DocumentReader for PdfiumReader {
    fn read(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(u32, AppResult<PageInput>) -> AppResult<()>,
    ) -> AppResult<()> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| AppError::Pdf(format!("open {}: {}", path.display(), e)))?;
        let pages = document.pages();

        for index in 0..pages.len() {
            let number = u32::from(index) + 1;
            let input = pages
                .get(index)
                .pdf_err("load page")
                .and_then(|page| self.page_input(number, &page));
            visit(number, input)?;
        }
        Ok(())
    }
}
