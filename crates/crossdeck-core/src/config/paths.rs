//! Standard configuration locations

use std::path::PathBuf;

/// Config file name inside [`config_dir`]
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Per-user configuration directory
///
/// Returns: `<platform config dir>/crossdeck` (e.g. `~/.config/crossdeck`),
/// or `./crossdeck` when the platform has none.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crossdeck")
}

/// Default config file path: `<config_dir>/config.yaml`
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}
