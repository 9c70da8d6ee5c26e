pub mod scripted;

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;
