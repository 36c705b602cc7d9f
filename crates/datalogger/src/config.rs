//! Configuration management for datalogger.
//!
//! Tuning values (thresholds, cadences, durations) are loaded with figment
//! from serde defaults merged with an optional TOML file. The log directory
//! itself is not configured here; it comes from the one-line path file read
//! by [`crate::path::PathResolver`], whose name is configured in `[paths]`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory under the platform config dir holding the config file.
const CONFIG_DIR_NAME: &str = "datalogger";

/// Application configuration.
///
/// Loaded from (highest precedence first):
/// 1. TOML config file at `~/.config/datalogger/config.toml`
/// 2. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log file location and naming.
    pub paths: PathsConfig,
    /// Motion detection thresholds.
    pub motion: MotionConfig,
    /// Prompt flasher timing.
    pub prompt: PromptConfig,
    /// Session cadences and indicator bounds.
    pub session: SessionConfig,
}

/// Log file location and naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// File whose first line names the log directory.
    pub path_file: PathBuf,
    /// Name written into every track's `<name>` element.
    pub track_name: String,
}

/// Motion detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Ground speed (whole units) that must be exceeded to count as moving.
    pub ground_speed_threshold: i64,
    /// Consecutive above-threshold status ticks needed to confirm motion.
    pub moving_ticks: u32,
}

/// Prompt flasher timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Number of flasher ticks before the prompt settles.
    pub flash_ticks: u32,
    /// Delay between flasher ticks in milliseconds.
    pub flash_interval_ms: u64,
}

/// Session cadences and indicator bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Draw frames the file-open error stays on screen (and blocks clicks).
    pub file_error_frames: u32,
    /// Largest dot count of the "still alive" indicator.
    pub indicator_max: u32,
    /// Delay between position samples while logging, in milliseconds.
    pub sample_interval_ms: u64,
    /// Status tick delay while stationary, in milliseconds.
    pub idle_interval_ms: u64,
    /// Status tick delay once motion is confirmed, in milliseconds.
    pub moving_interval_ms: u64,
    /// Status tick delay while logging, in milliseconds.
    pub enabled_interval_ms: u64,
    /// Status tick delay while the host has the plugin disabled, in milliseconds.
    pub host_disabled_interval_ms: u64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            path_file: PathBuf::from("DataLogPath.txt"),
            track_name: "DataLogger plugin".to_string(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            ground_speed_threshold: 2,
            moving_ticks: 5,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            flash_ticks: 20,
            flash_interval_ms: 500,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file_error_frames: 120,
            indicator_max: 10,
            sample_interval_ms: 100,
            idle_interval_ms: 1_000,
            moving_interval_ms: 2_000,
            enabled_interval_ms: 1_000,
            host_disabled_interval_ms: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be parsed or fails validation.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be parsed or fails validation.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any count or interval is zero, or the track name is empty.
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("motion.moving_ticks", self.motion.moving_ticks),
            ("prompt.flash_ticks", self.prompt.flash_ticks),
            ("session.file_error_frames", self.session.file_error_frames),
            ("session.indicator_max", self.session.indicator_max),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(Error::config_validation(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        let intervals = [
            ("prompt.flash_interval_ms", self.prompt.flash_interval_ms),
            ("session.sample_interval_ms", self.session.sample_interval_ms),
            ("session.idle_interval_ms", self.session.idle_interval_ms),
            ("session.moving_interval_ms", self.session.moving_interval_ms),
            ("session.enabled_interval_ms", self.session.enabled_interval_ms),
            (
                "session.host_disabled_interval_ms",
                self.session.host_disabled_interval_ms,
            ),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(Error::config_validation(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        if self.paths.track_name.trim().is_empty() {
            return Err(Error::config_validation("paths.track_name must not be empty"));
        }

        Ok(())
    }

    /// Delay between flasher ticks.
    #[must_use]
    pub fn flash_interval(&self) -> Duration {
        Duration::from_millis(self.prompt.flash_interval_ms)
    }

    /// Delay between position samples while logging.
    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.session.sample_interval_ms)
    }

    /// Status tick delay while stationary.
    #[must_use]
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.session.idle_interval_ms)
    }

    /// Status tick delay once motion is confirmed.
    #[must_use]
    pub fn moving_interval(&self) -> Duration {
        Duration::from_millis(self.session.moving_interval_ms)
    }

    /// Status tick delay while logging.
    #[must_use]
    pub fn enabled_interval(&self) -> Duration {
        Duration::from_millis(self.session.enabled_interval_ms)
    }

    /// Status tick delay while the host has the plugin disabled.
    #[must_use]
    pub fn host_disabled_interval(&self) -> Duration {
        Duration::from_millis(self.session.host_disabled_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.paths.path_file, PathBuf::from("DataLogPath.txt"));
        assert_eq!(config.paths.track_name, "DataLogger plugin");
        assert_eq!(config.motion.ground_speed_threshold, 2);
        assert_eq!(config.motion.moving_ticks, 5);
        assert_eq!(config.prompt.flash_ticks, 20);
        assert_eq!(config.session.file_error_frames, 120);
        assert_eq!(config.session.indicator_max, 10);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_moving_ticks() {
        let mut config = Config::default();
        config.motion.moving_ticks = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("motion.moving_ticks"));
    }

    #[test]
    fn test_validate_zero_sample_interval() {
        let mut config = Config::default();
        config.session.sample_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session.sample_interval_ms"));
    }

    #[test]
    fn test_validate_blank_track_name() {
        let mut config = Config::default();
        config.paths.track_name = "   ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("track_name"));
    }

    #[test]
    fn test_intervals() {
        let config = Config::default();

        assert_eq!(config.flash_interval(), Duration::from_millis(500));
        assert_eq!(config.sample_interval(), Duration::from_millis(100));
        assert_eq!(config.idle_interval(), Duration::from_secs(1));
        assert_eq!(config.moving_interval(), Duration::from_secs(2));
        assert_eq!(config.enabled_interval(), Duration::from_secs(1));
        assert_eq!(config.host_disabled_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("datalogger"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(
            &file,
            "[motion]\nmoving_ticks = 3\n\n[prompt]\nflash_ticks = 8\n",
        )
        .unwrap();

        let config = Config::load_from(Some(file)).unwrap();
        assert_eq!(config.motion.moving_ticks, 3);
        assert_eq!(config.motion.ground_speed_threshold, 2);
        assert_eq!(config.prompt.flash_ticks, 8);
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_load_invalid_toml_value() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "[session]\nindicator_max = 0\n").unwrap();

        let err = Config::load_from(Some(file)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_session_config_serialize() {
        let json = serde_json::to_string(&SessionConfig::default()).unwrap();
        assert!(json.contains("file_error_frames"));
    }
}
