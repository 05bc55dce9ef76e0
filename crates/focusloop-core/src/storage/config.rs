//! TOML-based application configuration.
//!
//! Stores the durations of each session type, the work/break cycle rules,
//! adaptive-duration settings, usage tracking and statistics preferences.
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::policy::AdaptationMode;
use crate::session::SessionType;
use crate::timer::machine::MAX_SPAN_SECS;

/// Base duration of every session type, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationsConfig {
    #[serde(default = "default_work_secs")]
    pub work_secs: u64,
    #[serde(default = "default_short_break_secs")]
    pub short_break_secs: u64,
    #[serde(default = "default_long_break_secs")]
    pub long_break_secs: u64,
}

/// Work/break cycle and auto-start behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Every Nth completed work session is followed by a long break.
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_work: bool,
    /// Delay between a completion and the auto-started session.
    #[serde(default = "default_auto_start_delay_secs")]
    pub auto_start_delay_secs: u64,
    /// How long a completed session stays visible before the timer goes idle.
    #[serde(default = "default_completion_display_secs")]
    pub completion_display_secs: u64,
    /// Default goal for a new focus period.
    #[serde(default = "default_target_rounds")]
    pub target_rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: AdaptationMode,
    #[serde(default = "default_adaptive_min_secs")]
    pub min_secs: u64,
    #[serde(default = "default_adaptive_max_secs")]
    pub max_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tracking_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Offset used to bucket sessions into calendar days. Local offset if unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub durations: DurationsConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub adaptive: AdaptiveConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

// Default functions
fn default_work_secs() -> u64 {
    25 * 60
}
fn default_short_break_secs() -> u64 {
    5 * 60
}
fn default_long_break_secs() -> u64 {
    15 * 60
}
fn default_long_break_interval() -> u32 {
    4
}
fn default_auto_start_delay_secs() -> u64 {
    3
}
fn default_completion_display_secs() -> u64 {
    5
}
fn default_target_rounds() -> u32 {
    4
}
fn default_adaptive_min_secs() -> u64 {
    10 * 60
}
fn default_adaptive_max_secs() -> u64 {
    60 * 60
}
fn default_tracking_interval_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            work_secs: default_work_secs(),
            short_break_secs: default_short_break_secs(),
            long_break_secs: default_long_break_secs(),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            long_break_interval: default_long_break_interval(),
            auto_start_breaks: false,
            auto_start_work: false,
            auto_start_delay_secs: default_auto_start_delay_secs(),
            completion_display_secs: default_completion_display_secs(),
            target_rounds: default_target_rounds(),
        }
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: AdaptationMode::EnergyBased,
            min_secs: default_adaptive_min_secs(),
            max_secs: default_adaptive_max_secs(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_tracking_interval_secs(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => parse_number(value).ok_or_else(|| {
                    invalid(format!("cannot parse '{value}' as number"))
                })?,
                // Optional fields serialize as null; accept a number or clear it.
                serde_json::Value::Null => match value {
                    "" | "none" | "null" => serde_json::Value::Null,
                    _ => parse_number(value)
                        .unwrap_or_else(|| serde_json::Value::String(value.into())),
                },
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Path of the config file inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result would not pass [`validate`](Self::validate).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every duration and delay must fit on the clock.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let spans = [
            ("durations.work_secs", self.durations.work_secs),
            ("durations.short_break_secs", self.durations.short_break_secs),
            ("durations.long_break_secs", self.durations.long_break_secs),
            ("cycle.auto_start_delay_secs", self.cycle.auto_start_delay_secs),
            ("cycle.completion_display_secs", self.cycle.completion_display_secs),
            ("adaptive.min_secs", self.adaptive.min_secs),
            ("adaptive.max_secs", self.adaptive.max_secs),
            ("tracking.interval_secs", self.tracking.interval_secs),
        ];
        match spans.iter().find(|(_, secs)| *secs > MAX_SPAN_SECS) {
            Some((key, secs)) => Err(ConfigError::InvalidValue {
                key: (*key).to_string(),
                message: format!("{secs} exceeds the limit of {MAX_SPAN_SECS} seconds"),
            }),
            None => Ok(()),
        }
    }

    /// Configured base duration for a session type.
    pub fn base_duration_secs(&self, session_type: SessionType) -> u64 {
        match session_type {
            SessionType::Work => self.durations.work_secs,
            SessionType::ShortBreak => self.durations.short_break_secs,
            SessionType::LongBreak => self.durations.long_break_secs,
        }
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<u64>() {
        Some(serde_json::Value::Number(n.into()))
    } else if let Ok(n) = value.parse::<i64>() {
        Some(serde_json::Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
    }
}
