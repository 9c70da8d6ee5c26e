use crate::error::OcrError;
use crate::request::OcrRequest;
use crate::response::OcrResponse;

/// Common interface for all OCR engines.
///
/// Instances are owned by a single worker thread and never shared, so
/// engines holding non-reentrant native handles can take `&mut self`.
pub trait TextRecognizer: Send {
    fn name(&self) -> &'static str;

    fn recognize(&mut self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError>;
}

/// Builds one recognizer per scanning worker.
pub trait RecognizerFactory: Send + Sync {
    fn create(&self, worker: usize) -> Result<Box<dyn TextRecognizer>, OcrError>;
}

impl<F> RecognizerFactory for F
where
    F: Fn(usize) -> Result<Box<dyn TextRecognizer>, OcrError> + Send + Sync,
{
    fn create(&self, worker: usize) -> Result<Box<dyn TextRecognizer>, OcrError> {
        self(worker)
    }
}

/// Placeholder engine used when no real backend is compiled in.
#[derive(Debug, Default)]
pub struct NoopRecognizer;

impl TextRecognizer for NoopRecognizer {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn recognize(&mut self, _: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        Ok(OcrResponse::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::LumaPlane;

    #[test]
    fn closures_act_as_factories() {
        let factory = |_: usize| -> Result<Box<dyn TextRecognizer>, OcrError> {
            Ok(Box::new(NoopRecognizer))
        };
        let mut recognizer = factory.create(3).unwrap();
        let data = [0u8; 4];
        let plane = LumaPlane::from_parts(2, 2, 2, &data).unwrap();
        let response = recognizer.recognize(&OcrRequest::new(plane)).unwrap();
        assert!(response.is_empty());
        assert_eq!(recognizer.name(), "noop");
    }
}
