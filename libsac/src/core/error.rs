//! error type shared by every layer of the codec

use thiserror::Error;

/// result alias used across the crate
pub type SacResult<T> = Result<T, SacError>;

#[derive(Debug, Error)]
pub enum SacError {
    /// malformed or truncated stream data
    #[error("invalid sac stream: {0}")]
    Format(String),

    /// rejected configuration, reported before any frame is processed
    #[error("invalid configuration: {0}")]
    Config(String),

    /// input outside what the codec handles
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// frame coder driven out of order
    #[error("frame coder is {found:?}, expected {expected:?}")]
    InvalidState {
        expected: crate::lossless::FrameState,
        found: crate::lossless::FrameState,
    },

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SacError {
    pub(crate) fn truncated(what: &str) -> Self {
        SacError::Format(format!("unexpected end of data while reading {what}"))
    }
}
