//! Scan a video for frames whose on-screen text satisfies keyword rules.
//!
//! Frames are sampled at a fixed stride by a pool of worker threads, run
//! through OCR and matched against whitelist and blacklist rules loaded from
//! a text file. Scanning stops as soon as the configured number of hard
//! matches has been found.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use vidgrep_decoder::{Backend, Configuration, DynFrameSource};
use vidgrep_ocr::{NoopRecognizer, OcrError, RecognizerFactory, TextRecognizer};

pub mod cli;
pub mod error;
pub mod output;
pub mod rules;
pub mod scan;
pub mod settings;

use cli::OcrBackend;
use error::{ScanError, VidgrepError};
use output::{ConsoleReport, OutputError, ScanJsonReport, render_elapsed, write_jpeg};
use rules::{RuleBook, load_rules};
use scan::{FrameScheduler, ScanOptions, ScanOutcome, ScanProgress};
use settings::{ConfigError, EffectiveSettings, OcrSettings};

const BACKEND_ENV: &str = "VIDGREP_BACKEND";

/// How a completed invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The full match limit was reached.
    Satisfied,
    /// The video was exhausted before the match limit was reached.
    Unsatisfied,
    /// Only informational output was requested.
    Listed,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Satisfied | RunStatus::Listed => 0,
            RunStatus::Unsatisfied => 1,
        }
    }
}

/// Scans `source` with one recognizer per worker and waits for the result.
pub fn scan(
    source: DynFrameSource,
    rules: &RuleBook,
    factory: Arc<dyn RecognizerFactory>,
    options: &ScanOptions,
    progress: ScanProgress,
) -> Result<ScanOutcome, ScanError> {
    let scheduler = FrameScheduler::start(source, rules, factory, options, progress)?;
    Ok(scheduler.wait_finish())
}

pub fn run(settings: EffectiveSettings) -> Result<RunStatus, VidgrepError> {
    if settings.list_backends {
        print_available_backends();
        return Ok(RunStatus::Listed);
    }

    let video = settings.video.clone().ok_or(ConfigError::Missing("video"))?;
    let terms = settings.terms.clone().ok_or(ConfigError::Missing("terms"))?;

    let rules = load_rules(&terms)?;
    if !settings.silent {
        print!("{rules}");
    }

    let source = open_source(&settings, &video)?;
    let factory = recognizer_factory(&settings.ocr)?;
    let options = ScanOptions {
        thread_count: settings.thread_count,
        match_limit: settings.match_limit,
        frame_skip: settings.frame_skip,
        crop: settings.crop,
        result_dir: settings.result_dir.clone(),
    };
    let progress = if settings.silent {
        ScanProgress::hidden()
    } else {
        ScanProgress::visible(source.frame_count(), options.frame_skip)
    };

    let started = Instant::now();
    let outcome = scan(source, &rules, factory, &options, progress)?;
    let elapsed = started.elapsed();

    let report = ConsoleReport::new(&video, &outcome);
    let report = if settings.silent { report.brief() } else { report };
    print!("{}", report.render());
    if !settings.silent {
        println!("{}", render_elapsed(elapsed));
    }

    if let Some(path) = settings.report.as_deref() {
        ScanJsonReport::new(&video, &outcome).write(path)?;
        tracing::info!(path = %path.display(), "wrote JSON report");
    }
    if settings.show {
        show_first_match(&outcome, settings.result_dir.as_deref());
    }

    Ok(if outcome.budget_satisfied() {
        RunStatus::Satisfied
    } else {
        RunStatus::Unsatisfied
    })
}

fn open_source(settings: &EffectiveSettings, video: &Path) -> Result<DynFrameSource, VidgrepError> {
    let env_override = env::var_os(BACKEND_ENV).is_some();
    let mut config = Configuration::from_env()?;
    if let Some(name) = settings.backend.as_deref() {
        if settings.backend_from_cli || !env_override {
            config.backend = Backend::from_str(name).map_err(|_| ConfigError::InvalidValue {
                path: settings.config_path.clone(),
                field: "backend",
                value: name.to_string(),
            })?;
        }
    }
    if !Configuration::available_backends().contains(&config.backend) {
        return Err(vidgrep_decoder::DecoderError::unsupported(config.backend.as_str()).into());
    }
    config.input = Some(video.to_path_buf());
    let source = config.create_source()?;
    tracing::info!(
        backend = source.name(),
        frames = source.frame_count(),
        video = %video.display(),
        "video opened"
    );
    Ok(source)
}

fn noop_factory(_: usize) -> Result<Box<dyn TextRecognizer>, OcrError> {
    Ok(Box::new(NoopRecognizer))
}

fn recognizer_factory(settings: &OcrSettings) -> Result<Arc<dyn RecognizerFactory>, VidgrepError> {
    match settings.backend {
        OcrBackend::Noop => Ok(Arc::new(noop_factory)),
        OcrBackend::Tesseract => tesseract_factory(settings),
        OcrBackend::Auto => {
            if cfg!(feature = "engine-tesseract") {
                tesseract_factory(settings)
            } else {
                tracing::warn!("no OCR engine compiled in, falling back to noop");
                Ok(Arc::new(noop_factory))
            }
        }
    }
}

#[cfg(feature = "engine-tesseract")]
fn tesseract_factory(settings: &OcrSettings) -> Result<Arc<dyn RecognizerFactory>, VidgrepError> {
    Ok(Arc::new(vidgrep_ocr::TesseractConfig {
        datapath: settings.tessdata.clone(),
        language: settings.language.clone(),
    }))
}

#[cfg(not(feature = "engine-tesseract"))]
fn tesseract_factory(_: &OcrSettings) -> Result<Arc<dyn RecognizerFactory>, VidgrepError> {
    Err(ConfigError::InvalidValue {
        path: None,
        field: "ocr.backend",
        value: "tesseract (not compiled in)".to_string(),
    }
    .into())
}

fn available_ocr_backends() -> Vec<&'static str> {
    let mut names = Vec::new();
    if cfg!(feature = "engine-tesseract") {
        names.push("tesseract");
    }
    names.push("noop");
    names
}

fn print_available_backends() {
    let decoders: Vec<&'static str> = Configuration::available_backends()
        .iter()
        .map(Backend::as_str)
        .collect();
    if decoders.is_empty() {
        println!("available decoder backends: (none compiled)");
    } else {
        println!("available decoder backends: {}", decoders.join(", "));
    }
    println!("available OCR backends: {}", available_ocr_backends().join(", "));
}

/// Opens the first hard match's annotated frame in the system viewer.
fn show_first_match(outcome: &ScanOutcome, result_dir: Option<&Path>) {
    let Some(first) = outcome.first_match() else {
        return;
    };
    let path = match (&first.saved_path, &first.snapshot) {
        (Some(path), _) => path.clone(),
        (None, Some(snapshot)) => {
            let dir = result_dir.map_or_else(env::temp_dir, Path::to_path_buf);
            let path: PathBuf = dir.join(format!("vidgrep-frame-{}.jpg", first.frame_index));
            let written = std::fs::create_dir_all(&dir)
                .map_err(OutputError::from)
                .and_then(|()| write_jpeg(&path, snapshot));
            if let Err(err) = written {
                tracing::warn!(error = %err, "failed to write frame for display");
                return;
            }
            path
        }
        (None, None) => {
            tracing::warn!(frame = first.frame_index, "no snapshot kept for the first match");
            return;
        }
    };
    if let Err(err) = open::that(&path) {
        tracing::warn!(path = %path.display(), error = %err, "failed to open frame viewer");
    }
}
