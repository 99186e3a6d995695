//! Output sink error types

use thiserror::Error;

/// Errors that can occur while opening or running an output sink
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available on the chosen driver
    #[error("No audio output devices found")]
    NoDevices,

    /// The requested driver is not available on this system
    #[error("Audio driver unavailable: {0}")]
    DriverUnavailable(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// The sink was started twice, or stopped while not running
    #[error("Output sink is {0}")]
    InvalidState(&'static str),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
