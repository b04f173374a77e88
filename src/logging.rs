//! Logging setup for binaries embedding the pipeline.
//!
//! The library itself only emits records through the [`log`] facade.

use log::LevelFilter;
use simplelog::{ColorChoice, TermLogger, TerminalMode};

/// Logging setup error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Logger initialization error.
    #[error("Logger initialization error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

/// Installs a terminal logger writing to stderr.
///
/// # Errors
///
/// An error is returned if a logger has already been set.
pub fn setup_logging(max_level: LevelFilter) -> Result<(), Error> {
    TermLogger::init(
        max_level,
        Default::default(),
        // stdout is reserved for rendered requests
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    Ok(())
}
