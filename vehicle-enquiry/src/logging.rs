use std::{fs::OpenOptions, path::Path};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Could not open log file. {0}")]
    LogFile(#[from] std::io::Error),
    #[error("A logger has already been set up. {0}")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Sets up logging to stderr and, optionally, to a log file.
///
/// Stderr gets warnings and errors, or everything down to debug when `debug` is
/// set. The log file, if any, is appended to and gets info and above.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a logger already exists.
pub fn init(debug: bool, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let term_level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        term_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let file_level = if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        loggers.push(WriteLogger::new(file_level, Config::default(), file));
    }

    CombinedLogger::init(loggers)?;
    Ok(())
}
