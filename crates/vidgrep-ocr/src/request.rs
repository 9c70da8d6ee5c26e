use crate::plane::LumaPlane;

/// OCR invocation metadata.
#[derive(Debug)]
pub struct OcrRequest<'a> {
    plane: LumaPlane<'a>,
    frame_index: Option<u64>,
}

impl<'a> OcrRequest<'a> {
    pub fn new(plane: LumaPlane<'a>) -> Self {
        Self {
            plane,
            frame_index: None,
        }
    }

    pub fn with_frame_index(mut self, index: u64) -> Self {
        self.frame_index = Some(index);
        self
    }

    pub fn plane(&self) -> &LumaPlane<'a> {
        &self.plane
    }

    pub fn frame_index(&self) -> Option<u64> {
        self.frame_index
    }
}
