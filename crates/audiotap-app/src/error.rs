//! Error types for audiotap app services
//!
//! Application-level errors that wrap engine errors and add app-specific variants.

use audiotap::error::TapError;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] TapError),

    /// The file-type gate refused the file
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Upload(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for audiotap app services
pub type Result<T> = std::result::Result<T, AppError>;
