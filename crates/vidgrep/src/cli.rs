use std::ffi::OsString;
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};

use crate::scan::{DEFAULT_FRAME_SKIP, DEFAULT_MATCH_LIMIT};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OcrBackend {
    /// Tesseract when compiled in, otherwise noop
    Auto,
    Tesseract,
    Noop,
}

/// Which defaulted options were given explicitly on the command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliSources {
    pub match_limit_from_cli: bool,
    pub frame_skip_from_cli: bool,
    pub ocr_backend_from_cli: bool,
    pub language_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            match_limit_from_cli: value_from_cli(matches, "match_limit"),
            frame_skip_from_cli: value_from_cli(matches, "frame_skip"),
            ocr_backend_from_cli: value_from_cli(matches, "ocr_backend"),
            language_from_cli: value_from_cli(matches, "language"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    let matches = CliArgs::command().get_matches();
    from_matches(&matches).unwrap_or_else(|err| err.exit())
}

/// Parses an explicit argument list, including the program name.
pub fn parse_cli_from<I, T>(args: I) -> Result<(CliArgs, CliSources), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = CliArgs::command().try_get_matches_from(args)?;
    from_matches(&matches)
}

fn from_matches(matches: &ArgMatches) -> Result<(CliArgs, CliSources), clap::Error> {
    let args = CliArgs::from_arg_matches(matches)?;
    Ok((args, CliSources::from_matches(matches)))
}

#[derive(Debug, Parser)]
#[command(
    name = "vidgrep",
    about = "Scan a video for on-screen text matching keyword rules",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Video to scan
    #[arg(short = 'v', long = "video", value_name = "FILE")]
    pub video: Option<PathBuf>,

    /// Rule file, one rule per line
    #[arg(short = 't', long = "terms", value_name = "FILE")]
    pub terms: Option<PathBuf>,

    /// Directory receiving an annotated JPEG for every match
    #[arg(long = "result-dir", value_name = "DIR")]
    pub result_dir: Option<PathBuf>,

    /// Open the first matching frame in the system image viewer
    #[arg(long = "show")]
    pub show: bool,

    /// Only print the first match and errors
    #[arg(short = 's', long = "silent", conflicts_with = "verbose")]
    pub silent: bool,

    /// Log per-frame progress
    #[arg(long = "verbose")]
    pub verbose: bool,

    /// Only scan the left half of each frame
    #[arg(long = "crop")]
    pub crop: bool,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(
        short = 'j',
        long = "thread-count",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub thread_count: Option<u32>,

    /// Hard matches to find before stopping
    #[arg(
        short = 'm',
        long = "match-limit",
        default_value_t = DEFAULT_MATCH_LIMIT as u32,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub match_limit: u32,

    /// Distance between examined frames
    #[arg(
        short = 'f',
        long = "frame-skip",
        default_value_t = DEFAULT_FRAME_SKIP,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub frame_skip: u64,

    /// Lock decoding to a specific backend implementation
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<String>,

    /// Preferred OCR backend
    #[arg(long = "ocr-backend", value_enum, default_value_t = OcrBackend::Auto)]
    pub ocr_backend: OcrBackend,

    /// Directory holding Tesseract language data
    #[arg(long = "tessdata", value_name = "DIR")]
    pub tessdata: Option<PathBuf>,

    /// Tesseract language code
    #[arg(long = "language", default_value = "eng")]
    pub language: String,

    /// Write a JSON report of all matches
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Print the compiled decoder and OCR backends
    #[arg(long = "list-backends")]
    pub list_backends: bool,

    /// Video to scan, when --video is not given
    pub input: Option<PathBuf>,
}
