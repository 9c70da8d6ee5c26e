use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::engine::{RecognizerFactory, TextRecognizer};
use crate::error::OcrError;
use crate::request::OcrRequest;
use crate::response::{OcrResponse, OcrText};

type FrameScript = HashMap<u64, Vec<OcrText>>;

/// Deterministic recognizer that answers from a per-frame script.
///
/// Requests without a frame index, or for frames missing from the script,
/// produce an empty response. Every recognized index is recorded so tests
/// can inspect which frames were actually processed.
#[derive(Debug, Clone)]
pub struct ScriptedRecognizer {
    frames: Arc<FrameScript>,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<u64>>>,
}

impl TextRecognizer for ScriptedRecognizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn recognize(&mut self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        let Some(index) = request.frame_index() else {
            return Ok(OcrResponse::empty());
        };
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(index);
        }
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let texts = self.frames.get(&index).cloned().unwrap_or_default();
        Ok(OcrResponse::new(texts))
    }
}

/// Factory handing every worker a recognizer over the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    frames: Arc<FrameScript>,
    delay: Option<Duration>,
    failing_worker: Option<usize>,
    seen: Arc<Mutex<Vec<u64>>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(mut self, index: u64, texts: Vec<OcrText>) -> Self {
        Arc::make_mut(&mut self.frames).insert(index, texts);
        self
    }

    /// Sleeps inside every recognition call to widen thread interleavings.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_failing_worker(mut self, worker: usize) -> Self {
        self.failing_worker = Some(worker);
        self
    }

    /// Frame indices recognized so far, in call order across all workers.
    pub fn seen_frames(&self) -> Vec<u64> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl RecognizerFactory for ScriptedFactory {
    fn create(&self, worker: usize) -> Result<Box<dyn TextRecognizer>, OcrError> {
        if self.failing_worker == Some(worker) {
            return Err(OcrError::init(
                "scripted",
                format!("worker {worker} configured to fail"),
            ));
        }
        Ok(Box::new(ScriptedRecognizer {
            frames: Arc::clone(&self.frames),
            delay: self.delay,
            seen: Arc::clone(&self.seen),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::LumaPlane;
    use vidgrep_types::BoundingBox;

    #[test]
    fn answers_from_script_and_records_frames() {
        let factory = ScriptedFactory::new().with_frame(
            4,
            vec![OcrText::new(BoundingBox::new(0, 0, 10, 10), "Sign In")],
        );
        let mut recognizer = factory.create(0).unwrap();
        let data = [0u8; 4];
        let plane = LumaPlane::from_parts(2, 2, 2, &data).unwrap();

        let hit = recognizer
            .recognize(&OcrRequest::new(plane.clone()).with_frame_index(4))
            .unwrap();
        let miss = recognizer
            .recognize(&OcrRequest::new(plane).with_frame_index(5))
            .unwrap();

        assert_eq!(hit.texts.len(), 1);
        assert_eq!(hit.texts[0].text, "Sign In");
        assert!(miss.is_empty());
        assert_eq!(factory.seen_frames(), vec![4, 5]);
    }

    #[test]
    fn failing_worker_reports_init_error() {
        let factory = ScriptedFactory::new().with_failing_worker(2);
        assert!(factory.create(1).is_ok());
        assert!(matches!(factory.create(2), Err(OcrError::Init { .. })));
    }
}
