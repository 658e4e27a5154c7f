//! Configuration for the gaze sentinel.

use crate::core::EngineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Tunable parameters of the gaze engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Horizontal half-width of the on-screen deadzone
    pub h_threshold: f64,
    /// Vertical half-height of the on-screen deadzone
    pub v_threshold: f64,
    /// Horizontal offset beyond which the Left/Right label is shown
    pub h_direction_threshold: f64,
    /// Vertical offset beyond which the Up/Down label is shown
    pub v_direction_threshold: f64,
    /// Debounce floor: shorter off-screen runs are never reported
    #[serde(with = "duration_serde")]
    pub min_look_away_duration: Duration,
    /// Sustained absence after which the alarm is raised
    #[serde(with = "duration_serde")]
    pub alarm_duration: Duration,
    /// Half-period of the visual alarm flash
    #[serde(with = "duration_serde")]
    pub alarm_flash_period: Duration,
    /// Number of samples in the smoothing window
    pub smoothing_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            h_threshold: 0.04,
            v_threshold: 0.04,
            h_direction_threshold: 0.02,
            v_direction_threshold: 0.015,
            min_look_away_duration: Duration::from_secs(3),
            alarm_duration: Duration::from_secs(15),
            alarm_flash_period: Duration::from_millis(500),
            smoothing_window: 10,
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let thresholds = [
            ("h_threshold", self.h_threshold),
            ("v_threshold", self.v_threshold),
            ("h_direction_threshold", self.h_direction_threshold),
            ("v_direction_threshold", self.v_direction_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.smoothing_window == 0 {
            return Err(EngineError::InvalidConfig(
                "smoothing_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Main configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine parameters
    pub engine: EngineConfig,

    /// Path for exporting session summaries
    pub export_path: PathBuf,

    /// Default log filter when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gaze-sentinel");

        Self {
            engine: EngineConfig::default(),
            export_path: data_dir.join("sessions"),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gaze-sentinel")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Serde support for Duration as fractional seconds.
mod duration_serde {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_config() {
        let config = EngineConfig::default();
        assert_eq!(config.h_threshold, 0.04);
        assert_eq!(config.v_threshold, 0.04);
        assert_eq!(config.min_look_away_duration, Duration::from_secs(3));
        assert_eq!(config.smoothing_window, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = EngineConfig {
            h_threshold: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        let config = EngineConfig {
            smoothing_window: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            v_threshold: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_durations_serialize_as_seconds() {
        let json = serde_json::to_value(EngineConfig::default()).unwrap();
        assert_eq!(json["min_look_away_duration"], 3.0);
        assert_eq!(json["alarm_flash_period"], 0.5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"engine": {"min_look_away_duration": 4.5}}"#).unwrap();
        assert_eq!(
            config.engine.min_look_away_duration,
            Duration::from_millis(4500)
        );
        assert_eq!(config.engine.h_threshold, 0.04);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_negative_duration_rejected() {
        let result: Result<EngineConfig, _> =
            serde_json::from_str(r#"{"alarm_duration": -1.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.engine.alarm_duration = Duration::from_secs(30);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.engine, config.engine);
    }

    #[test]
    fn test_ensure_directories_creates_export_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            export_path: dir.path().join("a").join("sessions"),
            ..Config::default()
        };
        config.ensure_directories().unwrap();
        assert!(config.export_path.is_dir());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.engine, EngineConfig::default());
    }
}
