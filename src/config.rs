//! Engine tunables: tick cadence, bonus constants and starting values.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_ENGINE_CONFIG: &str = include_str!("data/engine_config.json");

/// Environment variable pointing at an engine config override file.
pub const CONFIG_PATH_ENV: &str = "HEART_CLICKER_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Milliseconds of game time covered by one tick.
    pub tick_ms: u64,
    pub fever_duration_ms: u64,
    /// Auto-rate multiplier while fever is active.
    pub fever_multiplier: f64,
    /// How long a lucky bonus stays claimable.
    pub lucky_window_ms: u64,
    /// Lucky reward: seconds of auto income ...
    pub lucky_rate_seconds: f64,
    /// ... plus this many manual clicks.
    pub lucky_click_multiplier: f64,
    pub cost_growth: f64,
    pub starting_click_power: u64,
    pub starting_lucky_chance: f64,
    pub starting_fever_chance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            fever_duration_ms: 10_000,
            fever_multiplier: 2.0,
            lucky_window_ms: 5_000,
            lucky_rate_seconds: 30.0,
            lucky_click_multiplier: 100.0,
            cost_growth: 1.25,
            starting_click_power: 1,
            starting_lucky_chance: 0.01,
            starting_fever_chance: 0.005,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read engine config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("engine config field `{field}` is out of range")]
    OutOfRange { field: &'static str },
}

impl EngineConfig {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_ENGINE_CONFIG).expect("builtin engine config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let out = |field| Err(ConfigError::OutOfRange { field });
        if self.tick_ms == 0 {
            return out("tick_ms");
        }
        if !(self.fever_multiplier.is_finite() && self.fever_multiplier >= 1.0) {
            return out("fever_multiplier");
        }
        if !(self.cost_growth.is_finite() && self.cost_growth > 1.0) {
            return out("cost_growth");
        }
        if !(self.lucky_rate_seconds.is_finite() && self.lucky_rate_seconds >= 0.0) {
            return out("lucky_rate_seconds");
        }
        if !(self.lucky_click_multiplier.is_finite() && self.lucky_click_multiplier >= 0.0) {
            return out("lucky_click_multiplier");
        }
        if self.starting_click_power == 0 {
            return out("starting_click_power");
        }
        if !(0.0..=1.0).contains(&self.starting_lucky_chance) {
            return out("starting_lucky_chance");
        }
        if !(0.0..=1.0).contains(&self.starting_fever_chance) {
            return out("starting_fever_chance");
        }
        Ok(())
    }

    /// Seconds of accrual covered by one tick.
    pub fn tick_seconds(&self) -> f64 {
        self.tick_ms as f64 / 1000.0
    }
}

/// Load the config from `HEART_CLICKER_CONFIG_PATH`, falling back to the
/// built-in values when the variable is unset or the file is unusable.
pub fn load_config_from_env() -> EngineConfig {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).map(PathBuf::from) {
        match EngineConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "heart_clicker::config",
                    path = %path.display(),
                    tick_ms = config.tick_ms,
                    "engine_config.loaded=file"
                );
                return config;
            }
            Err(err) => {
                tracing::warn!(
                    target: "heart_clicker::config",
                    path = %path.display(),
                    error = %err,
                    "engine_config.load_failed"
                );
            }
        }
    }
    tracing::info!(target: "heart_clicker::config", "engine_config.loaded=builtin");
    EngineConfig::builtin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_matches_default() {
        assert_eq!(EngineConfig::builtin(), EngineConfig::default());
    }

    #[test]
    fn tick_seconds_at_100ms() {
        let config = EngineConfig::default();
        assert!((config.tick_seconds() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "tick_ms": 50 }"#).unwrap();
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.fever_duration_ms, 10_000);
        assert!((config.tick_seconds() - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_tick_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "tick_ms": 0 }"#),
            Err(ConfigError::OutOfRange { field: "tick_ms" })
        ));
    }

    #[test]
    fn sub_unit_multiplier_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "fever_multiplier": 0.5 }"#),
            Err(ConfigError::OutOfRange { field: "fever_multiplier" })
        ));
    }

    #[test]
    fn probability_out_of_range_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "starting_fever_chance": 1.5 }"#),
            Err(ConfigError::OutOfRange { field: "starting_fever_chance" })
        ));
    }

    #[test]
    fn growth_must_exceed_one() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "cost_growth": 1.0 }"#),
            Err(ConfigError::OutOfRange { field: "cost_growth" })
        ));
    }
}
