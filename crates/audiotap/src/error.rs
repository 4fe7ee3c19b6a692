//! Error types for Audiotap
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for the audiotap engine
#[derive(Error, Debug)]
pub enum TapError {
    /// The platform could not provide an audio output
    #[error("Audio subsystem unavailable: {0}")]
    SubsystemUnavailable(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Engine is not initialized")]
    NotInitialized,

    #[error("Source is already playing")]
    AlreadyPlaying,

    #[error("A load is already in progress")]
    LoadInProgress,

    /// Two nodes created by different processing contexts were wired together
    #[error("Node {node} belongs to a different processing context")]
    ContextMismatch { node: String },

    #[error("Invalid gain value: {0}")]
    InvalidGain(f32),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio error: {0}")]
    Audio(String),
}

/// Result type alias for Audiotap
pub type Result<T> = std::result::Result<T, TapError>;

impl TapError {
    /// Whether the engine can keep going after this error.
    ///
    /// Only a missing audio subsystem ends the session; everything else leaves
    /// the engine in the state it was in before the failed call.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TapError::SubsystemUnavailable(_))
    }
}
