//! Error types for the gesture steering library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The detection source is unavailable or failed to produce a frame
    #[error("Detection source error: {0}")]
    DetectionSource(String),

    /// A recorded detection trace could not be parsed
    #[error("Trace format error: {0}")]
    TraceFormat(String),

    /// The calibration session could not be completed
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// Reading operator input failed
    #[error("Operator prompt error: {0}")]
    Prompt(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
