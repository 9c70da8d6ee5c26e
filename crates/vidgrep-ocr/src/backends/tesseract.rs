#![cfg(feature = "engine-tesseract")]

use std::path::PathBuf;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use leptess::{LepTess, Variable, capi};
use vidgrep_types::BoundingBox;

use crate::engine::{RecognizerFactory, TextRecognizer};
use crate::error::OcrError;
use crate::request::OcrRequest;
use crate::response::{OcrResponse, OcrText};

const ENGINE_NAME: &str = "tesseract";
/// Automatic page segmentation with orientation and script detection.
const PAGE_SEG_MODE_AUTO_OSD: &str = "1";

#[derive(Debug, Clone)]
pub struct TesseractConfig {
    pub datapath: Option<PathBuf>,
    pub language: String,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            datapath: None,
            language: "eng".to_string(),
        }
    }
}

impl RecognizerFactory for TesseractConfig {
    fn create(&self, worker: usize) -> Result<Box<dyn TextRecognizer>, OcrError> {
        Ok(Box::new(TesseractRecognizer::new(self, worker)?))
    }
}

/// Paragraph-level recognizer backed by a private Tesseract instance.
pub struct TesseractRecognizer {
    engine: LepTess,
    worker: usize,
}

// SAFETY: each recognizer owns its Tesseract handle and is only ever used
// by the worker thread it is moved into.
unsafe impl Send for TesseractRecognizer {}

impl TesseractRecognizer {
    pub fn new(config: &TesseractConfig, worker: usize) -> Result<Self, OcrError> {
        let datapath = match config.datapath.as_deref() {
            Some(path) => Some(path.to_str().ok_or_else(|| {
                OcrError::init(ENGINE_NAME, "tessdata path must be valid UTF-8")
            })?),
            None => None,
        };
        let mut engine = LepTess::new(datapath, &config.language)
            .map_err(|err| OcrError::init(ENGINE_NAME, err.to_string()))?;
        engine
            .set_variable(Variable::TesseditPagesegMode, PAGE_SEG_MODE_AUTO_OSD)
            .map_err(|err| OcrError::init(ENGINE_NAME, err.to_string()))?;
        tracing::debug!(worker, language = %config.language, "tesseract initialized");
        Ok(Self { engine, worker })
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn recognize(&mut self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        let plane = request.plane();
        if plane.is_empty() {
            return Ok(OcrResponse::empty());
        }

        let mut encoded = Vec::new();
        PngEncoder::new(&mut encoded)
            .write_image(&plane.packed(), plane.width(), plane.height(), ColorType::L8)
            .map_err(|err| OcrError::backend(err.to_string()))?;
        self.engine
            .set_image_from_mem(&encoded)
            .map_err(|err| OcrError::backend(err.to_string()))?;

        let Some(boxes) = self
            .engine
            .get_component_boxes(capi::TessPageIteratorLevel_RIL_PARA, true)
        else {
            return Ok(OcrResponse::empty());
        };

        let mut texts = Vec::new();
        for region in &boxes {
            let geometry = region.get_geometry();
            self.engine.set_rectangle_from_box(&region);
            let text = self
                .engine
                .get_utf8_text()
                .map_err(|err| OcrError::backend(err.to_string()))?;
            if text.trim().is_empty() {
                continue;
            }
            let bbox = BoundingBox::new(
                geometry.x.max(0) as u32,
                geometry.y.max(0) as u32,
                geometry.w.max(0) as u32,
                geometry.h.max(0) as u32,
            );
            texts.push(OcrText::new(bbox, text));
        }
        tracing::trace!(
            worker = self.worker,
            frame = ?request.frame_index(),
            blocks = texts.len(),
            "tesseract pass complete"
        );
        Ok(OcrResponse::new(texts))
    }
}
