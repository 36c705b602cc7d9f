//! Error types for datalogger.
//!
//! This module defines the error types used throughout the datalogger crate.
//! Only a few of them ever reach the host boundary: the session turns open
//! failures into an on-screen message and write failures into log warnings.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for datalogger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Track File Errors ===
    /// The log file could not be opened in the resolved directory nor in the
    /// working directory.
    #[error("failed to open log file {path} (fallback {fallback} also failed): {source}")]
    LogFileOpen {
        /// Path tried first.
        path: PathBuf,
        /// Bare file name tried in the working directory.
        fallback: PathBuf,
        /// The error from the fallback attempt.
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Replay Errors ===
    /// A telemetry trace line could not be parsed.
    #[error("invalid trace entry on line {line}: {source}")]
    TraceParse {
        /// One-based line number in the trace file.
        line: usize,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    // === Output Errors ===
    /// A GPX element could not be written.
    #[error("GPX write error: {0}")]
    Xml(#[from] quick_xml::Error),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for datalogger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error is a log-file open failure.
    #[must_use]
    pub fn is_log_file_open(&self) -> bool {
        matches!(self, Self::LogFileOpen { .. })
    }
}
