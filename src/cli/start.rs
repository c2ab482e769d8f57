use crate::cli::args::Args;
use crate::cli::config::Config;
use crate::error::AppError;
use clap::Parser;
use log::LevelFilter;

/// Parses arguments, installs the logger at the requested verbosity, and
/// validates the result into a `Config`. Mirrors the teacher's
/// `verbose` count → `LevelFilter` mapping.
///
/// # Errors
/// Returns `AppError::InvalidParameters` if validation fails.
pub fn start() -> Result<Config, AppError> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    Config::from_args(args)
}
