//! OCR (Optical Character Recognition) utilities

use std::path::Path;

use image::DynamicImage;
use ocr_rs::OcrEngine;

use crate::error::{AppError, AppResult, ResultExt};
use crate::services::OcrRegion;

/// Anything that can turn an image into text
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage) -> AppResult<String>;
}

/// PaddleOCR (PP-OCRv5 mobile) models loaded from the model directory
pub struct PaddleOcr {
    engine: OcrEngine,
}

impl PaddleOcr {
    pub fn new(model_dir: &Path) -> AppResult<Self> {
        let det_path = model_dir.join("PP-OCRv5_mobile_det.mnn");
        let rec_path = model_dir.join("PP-OCRv5_mobile_rec.mnn");
        let charset_path = model_dir.join("ppocr_keys_v5.txt");

        let det_path = det_path
            .to_str()
            .ok_or_else(|| AppError::Config("OCR detection model path is not UTF-8".into()))?;
        let rec_path = rec_path
            .to_str()
            .ok_or_else(|| AppError::Config("OCR recognition model path is not UTF-8".into()))?;
        let charset_path = charset_path
            .to_str()
            .ok_or_else(|| AppError::Config("OCR charset path is not UTF-8".into()))?;

        let engine = OcrEngine::new(det_path, rec_path, charset_path, None)
            .config_err("load OCR models")?;
        Ok(Self { engine })
    }
}

impl TextRecognizer for PaddleOcr {
    fn recognize(&self, image: &DynamicImage) -> AppResult<String> {
        let results = self.engine.recognize(image).pdf_err("ocr")?;
        let text = results
            .into_iter()
            .map(|result| result.text)
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(text)
    }
}

/// Crop a fractional region out of a rendered page
pub fn crop_region(page: &DynamicImage, region: &OcrRegion) -> AppResult<DynamicImage> {
    let (width, height) = (page.width(), page.height());
    let to_px = |fraction: f32, extent: u32| ((fraction.clamp(0.0, 1.0) * extent as f32) as u32).min(extent);

    let x0 = to_px(region.x0, width);
    let y0 = to_px(region.y0, height);
    let x1 = to_px(region.x1, width);
    let y1 = to_px(region.y1, height);

    if x1 <= x0 || y1 <= y0 {
        return Err(AppError::Validation(format!(
            "ocr region {} is empty on a {}x{} page",
            region.name, width, height
        )));
    }

    Ok(page.crop_imm(x0, y0, x1 - x0, y1 - y0))
}
