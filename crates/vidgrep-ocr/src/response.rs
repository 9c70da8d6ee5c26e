use vidgrep_types::BoundingBox;

/// One paragraph-level block of recognized text.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrText {
    pub bbox: BoundingBox,
    pub text: String,
    pub confidence: Option<f32>,
}

impl OcrText {
    pub fn new(bbox: BoundingBox, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, value: f32) -> Self {
        self.confidence = Some(value);
        self
    }
}

/// Blocks recognized in a single image, in engine order.
#[derive(Debug, Clone, Default)]
pub struct OcrResponse {
    pub texts: Vec<OcrText>,
}

impl OcrResponse {
    pub fn new(texts: Vec<OcrText>) -> Self {
        Self { texts }
    }

    pub fn empty() -> Self {
        Self { texts: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
