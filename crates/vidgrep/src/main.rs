use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use vidgrep::cli::{CliArgs, parse_cli};
use vidgrep::run;
use vidgrep::settings::resolve_settings;

/// Exit code for configuration and startup failures.
const EXIT_FAILURE: u8 = 2;

fn main() -> ExitCode {
    let (cli, sources) = parse_cli();
    init_tracing(&cli);

    let settings = match resolve_settings(&cli, &sources) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match run(settings) {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_tracing(cli: &CliArgs) {
    let default_level = if cli.silent {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
