//! Engine error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by deck loading and transport control
///
/// Everything here is reported synchronously on the control context. The
/// audio path never produces one of these; it degrades to silence instead.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The file does not exist
    #[error("Audio file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Media that could not be decoded, or decoded to nothing playable
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// Container or codec the decoder does not handle
    #[error("Unsupported audio file format: {0}")]
    UnsupportedFormat(String),

    /// An index outside the stored range (cue points, mixer slots)
    #[error("Index {index} out of range (count {count})")]
    OutOfRange { index: usize, count: usize },

    /// Broken audio/control handoff. Indicates a defect, not a runtime condition.
    #[error("Concurrency invariant violated: {0}")]
    ConcurrencyInvariantViolation(String),
}

impl EngineError {
    /// True for the error kinds a failed load reports
    pub fn is_format_error(&self) -> bool {
        matches!(self, EngineError::Decode(_) | EngineError::UnsupportedFormat(_))
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
