//! Engine configuration
//!
//! YAML-backed, every section `#[serde(default)]` so a partial file only
//! overrides what it names:
//!
//! ```yaml
//! audio:
//!   driver: LowLatency
//!   buffer_size: !Fixed 256
//! mixer:
//!   master_volume: 0.9
//! decks:
//!   crossfader: -1.0
//! ```
//!
//! ```ignore
//! use crossdeck_core::config::{load_config, default_config_path, EngineConfig};
//!
//! let config: EngineConfig = load_config(&default_config_path());
//! ```

mod io;
mod paths;

use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::engine::limiter::{DEFAULT_BUS_CEILING, DEFAULT_BUS_KNEE, DEFAULT_SOURCE_LIMIT};

pub use io::{load_config, parse_config};
pub use paths::{config_dir, default_config_path, CONFIG_FILE_NAME};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub audio: AudioConfig,
    pub mixer: MixerConfig,
    pub decks: DeckDefaults,
}

/// Limiter and master settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Per-source limiter threshold (linear, 0..1]
    pub source_limit: f32,
    /// Bus soft-clip knee (linear)
    pub bus_knee: f32,
    /// Bus soft-clip ceiling (linear, <= 1.0)
    pub bus_ceiling: f32,
    /// Master gain [0, 1]
    pub master_volume: f32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            source_limit: DEFAULT_SOURCE_LIMIT,
            bus_knee: DEFAULT_BUS_KNEE,
            bus_ceiling: DEFAULT_BUS_CEILING,
            master_volume: 1.0,
        }
    }
}

/// Initial deck and crossfader settings applied at startup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckDefaults {
    /// Base volume for both decks [0, 2]
    pub volume: f32,
    /// Crossfader position [-1, 1]
    pub crossfader: f32,
}

impl Default for DeckDefaults {
    fn default() -> Self {
        Self {
            volume: 1.0,
            crossfader: 0.0,
        }
    }
}
