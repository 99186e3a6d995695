//! Output configuration
//!
//! Driver choice, device selection, and period size for the sink chosen by
//! the bootstrap layer.

use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE, SAMPLE_RATE};

/// Period used by the low-latency driver when no size is configured
pub const LOW_LATENCY_BUFFER_SIZE: u32 = 256;

/// Output driver variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputDriver {
    /// Pro-audio path (JACK where available) with small fixed periods
    #[default]
    LowLatency,
    /// The platform's default host and device
    Generic,
}

impl OutputDriver {
    /// The driver to try when this one fails to open
    pub fn fallback(&self) -> OutputDriver {
        match self {
            OutputDriver::LowLatency => OutputDriver::Generic,
            OutputDriver::Generic => OutputDriver::LowLatency,
        }
    }
}

/// Preferred period for the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Driver default (low-latency driver uses [`LOW_LATENCY_BUFFER_SIZE`])
    #[default]
    Default,
    /// A specific period in frames (clamped to 16..=MAX_BUFFER_SIZE)
    Fixed(u32),
}

impl BufferSize {
    /// Frames per period for `driver`, or None for the host's own default
    pub fn frames_for(&self, driver: OutputDriver) -> Option<u32> {
        match (self, driver) {
            (BufferSize::Fixed(frames), _) => Some((*frames).clamp(16, MAX_BUFFER_SIZE as u32)),
            (BufferSize::Default, OutputDriver::LowLatency) => Some(LOW_LATENCY_BUFFER_SIZE),
            (BufferSize::Default, OutputDriver::Generic) => None,
        }
    }

    /// Frames per period, falling back to [`DEFAULT_BUFFER_SIZE`]
    pub fn frames_or_default(&self, driver: OutputDriver) -> u32 {
        self.frames_for(driver).unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    /// Period length in milliseconds at the engine rate
    pub fn latency_ms(&self, driver: OutputDriver) -> f32 {
        self.frames_or_default(driver) as f32 / SAMPLE_RATE as f32 * 1000.0
    }
}

/// Audio device identifier
///
/// Device name plus the host backend (JACK, ALSA, ...) it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier (e.g., "JACK", "ALSA", "CoreAudio")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Output section of the engine config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Driver tried first; the other one is the fallback
    pub driver: OutputDriver,
    /// Output device (None = driver default)
    pub device: Option<DeviceId>,
    /// Preferred period size
    pub buffer_size: BufferSize,
}
