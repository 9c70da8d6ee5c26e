use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vidgrep_decoder::DecoderError;
use vidgrep_ocr::OcrError;

use crate::output::OutputError;
use crate::settings::ConfigError;

#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("failed to read rule file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("rule file {} contains no rules", .path.display())]
    NoRules { path: PathBuf },
}

/// Failures that abort a scan before any frame is processed.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("worker {worker} failed to initialize: {source}")]
    WorkerInit {
        worker: usize,
        #[source]
        source: OcrError,
    },
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },
    #[error("worker {worker} exited before reporting readiness")]
    WorkerLost { worker: usize },
}

#[derive(Debug, Error)]
pub enum VidgrepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rules(#[from] RuleLoadError),
    #[error("video source error: {0}")]
    Decoder(#[from] DecoderError),
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}
