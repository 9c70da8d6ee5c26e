use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;
use thiserror::Error;

use crate::cli::{CliArgs, CliSources, OcrBackend};

const PROJECT_CONFIG_FILE: &str = "vidgrep.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    backend: Option<String>,
    terms: Option<String>,
    result_dir: Option<String>,
    report: Option<String>,
    crop: Option<bool>,
    thread_count: Option<usize>,
    match_limit: Option<usize>,
    frame_skip: Option<u64>,
    ocr: Option<OcrFileConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OcrFileConfig {
    backend: Option<String>,
    tessdata: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub backend: OcrBackend,
    pub tessdata: Option<PathBuf>,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub video: Option<PathBuf>,
    pub terms: Option<PathBuf>,
    pub result_dir: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub show: bool,
    pub silent: bool,
    pub verbose: bool,
    pub crop: bool,
    pub thread_count: Option<usize>,
    pub match_limit: usize,
    pub frame_skip: u64,
    pub backend: Option<String>,
    /// Whether `backend` came from the command line rather than a file.
    pub backend_from_cli: bool,
    pub ocr: OcrSettings,
    pub list_backends: bool,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for '{field}'{}", location(.path.as_deref()))]
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    #[error("config file {} does not exist", .path.display())]
    NotFound { path: PathBuf },
    #[error("missing required option '{0}'")]
    Missing(&'static str),
}

fn location(path: Option<&Path>) -> String {
    path.map(|path| format!(" in {}", path.display()))
        .unwrap_or_default()
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = expand_pathbuf(path.to_path_buf());
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        return read_config(path);
    }

    let candidates = [project_config_path(), default_config_path()];
    for path in candidates.into_iter().flatten() {
        if path.exists() {
            return read_config(path);
        }
    }
    Ok((FileConfig::default(), None))
}

fn read_config(path: PathBuf) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok((config, Some(path)))
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let config_dir = config_path
        .as_ref()
        .and_then(|path| path.parent().map(Path::to_path_buf));
    let base = config_dir.as_deref();

    let FileConfig {
        backend: file_backend,
        terms: file_terms,
        result_dir: file_result_dir,
        report: file_report,
        crop: file_crop,
        thread_count: file_thread_count,
        match_limit: file_match_limit,
        frame_skip: file_frame_skip,
        ocr: file_ocr,
    } = file;
    let file_ocr = file_ocr.unwrap_or_default();

    let video = cli
        .video
        .clone()
        .or_else(|| cli.input.clone())
        .map(expand_pathbuf);

    let terms = match cli.terms.clone() {
        Some(path) => Some(expand_pathbuf(path)),
        None => normalize_string(file_terms).and_then(|value| resolve_path_from_config(value, base)),
    };
    let result_dir = match cli.result_dir.clone() {
        Some(path) => Some(expand_pathbuf(path)),
        None => normalize_string(file_result_dir)
            .and_then(|value| resolve_path_from_config(value, base)),
    };
    let report = match cli.report.clone() {
        Some(path) => Some(expand_pathbuf(path)),
        None => {
            normalize_string(file_report).and_then(|value| resolve_path_from_config(value, base))
        }
    };

    let cli_backend = normalize_string(cli.backend.clone());
    let backend_from_cli = cli_backend.is_some();
    let backend = cli_backend.or_else(|| normalize_string(file_backend));

    let thread_count = match cli.thread_count {
        Some(value) => Some(value as usize),
        None => match file_thread_count {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    path: config_path,
                    field: "thread_count",
                    value: "0".to_string(),
                });
            }
            other => other,
        },
    };

    let mut match_limit = cli.match_limit as usize;
    if !sources.match_limit_from_cli {
        if let Some(value) = file_match_limit {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    path: config_path,
                    field: "match_limit",
                    value: value.to_string(),
                });
            }
            match_limit = value;
        }
    }

    let mut frame_skip = cli.frame_skip;
    if !sources.frame_skip_from_cli {
        if let Some(value) = file_frame_skip {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    path: config_path,
                    field: "frame_skip",
                    value: value.to_string(),
                });
            }
            frame_skip = value;
        }
    }

    let mut ocr_backend = cli.ocr_backend;
    if !sources.ocr_backend_from_cli {
        if let Some(value) = normalize_string(file_ocr.backend) {
            ocr_backend = parse_ocr_backend(&value, config_path.as_ref())?;
        }
    }

    let mut language = cli.language.trim().to_string();
    if !sources.language_from_cli {
        if let Some(value) = normalize_string(file_ocr.language) {
            language = value;
        }
    }
    if language.is_empty() {
        return Err(ConfigError::InvalidValue {
            path: None,
            field: "language",
            value: cli.language.clone(),
        });
    }

    let tessdata = match cli.tessdata.clone() {
        Some(path) => Some(expand_pathbuf(path)),
        None => normalize_string(file_ocr.tessdata)
            .and_then(|value| resolve_path_from_config(value, base)),
    };

    Ok(EffectiveSettings {
        video,
        terms,
        result_dir,
        report,
        show: cli.show,
        silent: cli.silent,
        verbose: cli.verbose,
        crop: cli.crop || file_crop.unwrap_or(false),
        thread_count,
        match_limit,
        frame_skip,
        backend,
        backend_from_cli,
        ocr: OcrSettings {
            backend: ocr_backend,
            tessdata,
            language,
        },
        list_backends: cli.list_backends,
        config_path,
    })
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "vidgrep", "vidgrep").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir()
        .ok()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn expand_pathbuf(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_home_path(s),
        None => path,
    }
}

fn resolve_path_from_config(value: String, base: Option<&Path>) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_home_path(trimmed);
    match base {
        Some(base) if !expanded.is_absolute() => Some(base.join(expanded)),
        _ => Some(expanded),
    }
}

fn expand_home_path(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(stripped) = value.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(stripped);
        }
    }
    PathBuf::from(value)
}

fn parse_ocr_backend(value: &str, path: Option<&PathBuf>) -> Result<OcrBackend, ConfigError> {
    OcrBackend::from_str(value, true).map_err(|_| ConfigError::InvalidValue {
        path: path.cloned(),
        field: "ocr.backend",
        value: value.to_string(),
    })
}
