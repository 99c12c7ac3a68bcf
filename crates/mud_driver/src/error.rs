//! # Driver Error Types
//!
//! Everything that can stop the driver from starting or running.

use std::io;
use std::path::PathBuf;

use mud_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The configuration file could not be read.
    #[error("cannot read configuration '{}': {source}", path.display())]
    ConfigRead {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The configuration file is not valid TOML for the driver settings.
    #[error("cannot parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// One or more settings failed validation.
    #[error("invalid configuration:\n{0}")]
    InvalidConfig(String),

    /// A log directory or log file could not be set up.
    #[error("cannot open log '{}': {source}", path.display())]
    LogFile {
        /// The log file being opened.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A driver thread could not be started.
    #[error("cannot start {thread} thread: {source}")]
    ThreadSpawn {
        /// Name of the thread.
        thread: &'static str,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A core contract was violated.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
