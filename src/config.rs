use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::AudioSettings;
use crate::error::ConfigError;
use crate::filter::{FilterPolicy, SignalThresholds};
use crate::logging::LogConfig;
use crate::telemetry::TelemetrySettings;

/// Main tracker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Sample acceptance thresholds
    pub filter: FilterPolicy,

    /// Derived metric and timing settings
    pub telemetry: TelemetrySettings,

    /// Accuracy bands for the signal indicator
    pub signal: SignalThresholds,

    /// Voice and tone feedback
    pub audio: AudioSettings,

    /// Logging output
    pub logging: LogConfig,
}

/// Configuration management implementation
impl TrackerConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: TrackerConfig = toml::from_str(&content)
            .map_err(ConfigError::from)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        // Create directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pacetrack")
            .join("config.toml")
    }

    /// Reject thresholds that would make the pipeline meaningless
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let f = &self.filter;
        positive("filter.max_accuracy_m", f.max_accuracy_m)?;
        non_negative("filter.min_displacement_m", f.min_displacement_m)?;
        non_negative("filter.min_elevation_delta_m", f.min_elevation_delta_m)?;
        if f.min_elevation_delta_m >= f.max_elevation_delta_m {
            return Err(ConfigError::EmptyElevationBand {
                min: f.min_elevation_delta_m,
                max: f.max_elevation_delta_m,
            });
        }
        if let Some(speed) = f.max_plausible_speed_mps {
            positive("filter.max_plausible_speed_mps", speed)?;
        }

        let t = &self.telemetry;
        non_negative("telemetry.speed_floor_mps", t.speed_floor_mps)?;
        non_negative("telemetry.avg_pace_min_distance_m", t.avg_pace_min_distance_m)?;
        positive("telemetry.body_weight_kg", t.body_weight_kg)?;
        positive("telemetry.calorie_factor", t.calorie_factor)?;
        if t.pace_history_capacity == 0 {
            return Err(invalid("telemetry.pace_history_capacity", 0));
        }
        if t.tick_interval_ms == 0 {
            return Err(invalid("telemetry.tick_interval_ms", 0));
        }

        let s = &self.signal;
        if s.strong_max_m > s.ok_max_m {
            return Err(invalid("signal.strong_max_m", s.strong_max_m));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn positive(field: &str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value))
    }
}

fn non_negative(field: &str, value: f64) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value))
    }
}
