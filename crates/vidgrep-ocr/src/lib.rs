mod backends;
mod engine;
mod error;
mod plane;
mod request;
mod response;

pub use backends::scripted::{ScriptedFactory, ScriptedRecognizer};
#[cfg(feature = "engine-tesseract")]
pub use backends::tesseract::{TesseractConfig, TesseractRecognizer};
pub use engine::{NoopRecognizer, RecognizerFactory, TextRecognizer};
pub use error::OcrError;
pub use plane::LumaPlane;
pub use request::OcrRequest;
pub use response::{OcrResponse, OcrText};
pub use vidgrep_types::BoundingBox;
