//! YAML configuration loading
//!
//! A missing or broken config file is never fatal: the engine starts on
//! defaults and says why.

use std::path::Path;

use serde::de::DeserializeOwned;

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns the default config.
/// If the file exists but is invalid, logs a warning and returns the default.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return T::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_config::<T>(&contents) {
            Ok(config) => {
                log::info!("load_config: Successfully loaded config from {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("load_config: Failed to parse config: {}, using defaults", e);
                T::default()
            }
        },
        Err(e) => {
            log::warn!(
                "load_config: Failed to read config file: {}, using defaults",
                e
            );
            T::default()
        }
    }
}

/// Parse configuration from YAML text. An empty document yields the default.
pub fn parse_config<T>(contents: &str) -> Result<T, serde_yaml::Error>
where
    T: DeserializeOwned + Default,
{
    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OutputDriver;
    use crate::config::EngineConfig;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: EngineConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "audio:\n  driver: Generic\nmixer:\n  master_volume: 0.5\n",
        )
        .unwrap();

        let config: EngineConfig = load_config(&path);
        assert_eq!(config.audio.driver, OutputDriver::Generic);
        assert_eq!(config.mixer.master_volume, 0.5);
        assert_eq!(config.mixer.source_limit, 0.8);
        assert_eq!(config.decks.volume, 1.0);
    }

    #[test]
    fn test_invalid_yaml_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "mixer: [this is: not a mapping").unwrap();

        let config: EngineConfig = load_config(&path);
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config: EngineConfig = parse_config("  \n").unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
