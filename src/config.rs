use crate::defaults::{
    DELAY_BEFORE_START_MS, INITIAL_FACE_DETECTED, LETTER_DELAY_MS, MAX_DELAY_SECS, TICK_MS,
};
use crate::error::{RelayError, Result};
use crate::playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub playback: PlaybackSettings,
    pub relay: RelaySettings,
}

/// Playback pacing, in the units people write by hand
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackSettings {
    pub delay_before_start_secs: f64,
    pub letter_delay_secs: f64,
    pub tick_ms: u64,
    pub initial_face_detected: bool,
}

/// Relay identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RelaySettings {
    pub user_id: Option<String>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            delay_before_start_secs: DELAY_BEFORE_START_MS as f64 / 1000.0,
            letter_delay_secs: LETTER_DELAY_MS as f64 / 1000.0,
            tick_ms: TICK_MS,
            initial_face_detected: INITIAL_FACE_DETECTED,
        }
    }
}

impl PlaybackSettings {
    /// Rejects values the engine cannot pace with.
    pub fn validate(&self) -> Result<()> {
        check_seconds("delay_before_start_secs", self.delay_before_start_secs)?;
        check_seconds("letter_delay_secs", self.letter_delay_secs)?;
        if self.tick_ms == 0 {
            return Err(RelayError::ConfigInvalidValue {
                key: "tick_ms".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Converts to the engine's config, validating first.
    pub fn to_playback_config(&self) -> Result<PlaybackConfig> {
        self.validate()?;
        Ok(PlaybackConfig {
            delay_before_start: seconds_to_duration(self.delay_before_start_secs),
            letter_delay: seconds_to_duration(self.letter_delay_secs),
            tick: Duration::from_millis(self.tick_ms),
            initial_face_detected: self.initial_face_detected,
        })
    }
}

/// Millisecond resolution; callers validate first.
fn seconds_to_duration(secs: f64) -> Duration {
    Duration::from_millis((secs * 1000.0).round() as u64)
}

fn check_seconds(key: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(RelayError::ConfigInvalidValue {
            key: key.to_string(),
            message: format!("expected a non-negative number of seconds, got {value}"),
        });
    }
    if value > MAX_DELAY_SECS {
        return Err(RelayError::ConfigInvalidValue {
            key: key.to_string(),
            message: format!("must be at most {MAX_DELAY_SECS} seconds, got {value}"),
        });
    }
    Ok(())
}

impl Config {
    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.playback.validate()
    }

    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(RelayError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SIGNRELAY_START_DELAY → playback.delay_before_start_secs
    /// - SIGNRELAY_LETTER_DELAY → playback.letter_delay_secs
    /// - SIGNRELAY_TICK_MS → playback.tick_ms
    ///
    /// Empty or unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(secs) = env_parse::<f64>("SIGNRELAY_START_DELAY") {
            self.playback.delay_before_start_secs = secs;
        }

        if let Some(secs) = env_parse::<f64>("SIGNRELAY_LETTER_DELAY") {
            self.playback.letter_delay_secs = secs;
        }

        if let Some(ms) = env_parse::<u64>("SIGNRELAY_TICK_MS") {
            self.playback.tick_ms = ms;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/signrelay/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("signrelay").join("config.toml"))
            .ok_or_else(|| RelayError::Other("Could not determine config directory".to_string()))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| value.trim().parse().ok())
}
