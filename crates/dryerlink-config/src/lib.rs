//! Shared configuration for applications embedding the dryerlink engine.
//!
//! TOML profiles layered with `DRYERLINK_` environment variables, and
//! translation to `dryerlink_core::EngineConfig`. The engine itself never
//! reads files; the embedding application loads a profile here and hands
//! the result to `Controller::new`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dryerlink_core::EngineConfig;
use dryerlink_core::config::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_HISTORY_LIMIT, DEFAULT_OFFLINE_THRESHOLD, DEFAULT_SETPOINT_MAX,
    DEFAULT_SETPOINT_MIN,
};

const DEFAULT_PROFILE: &str = "default";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named profiles; each field overrides the matching default.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some(DEFAULT_PROFILE.into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    /// Seconds without telemetry before a device counts as offline.
    #[serde(default = "default_offline_threshold")]
    pub offline_threshold_secs: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_setpoint_min")]
    pub setpoint_min: f32,

    #[serde(default = "default_setpoint_max")]
    pub setpoint_max: f32,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            offline_threshold_secs: default_offline_threshold(),
            history_limit: default_history_limit(),
            setpoint_min: default_setpoint_min(),
            setpoint_max: default_setpoint_max(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_offline_threshold() -> u64 {
    DEFAULT_OFFLINE_THRESHOLD.as_secs()
}
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_setpoint_min() -> f32 {
    DEFAULT_SETPOINT_MIN
}
fn default_setpoint_max() -> f32 {
    DEFAULT_SETPOINT_MAX
}
fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

/// A named profile, e.g. one per dryer site with different limits.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    pub offline_threshold_secs: Option<u64>,
    pub history_limit: Option<usize>,
    pub setpoint_min: Option<f32>,
    pub setpoint_max: Option<f32>,
    pub event_capacity: Option<usize>,
}

impl Config {
    /// Name of the profile used when none is requested.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }

    /// Look up `name` (or the default profile).
    ///
    /// The default profile may be absent from the file, in which case
    /// it carries no overrides.
    pub fn profile(&self, name: Option<&str>) -> Result<Profile, ConfigError> {
        let name = name.unwrap_or_else(|| self.active_profile_name());
        match self.profiles.get(name) {
            Some(profile) => Ok(profile.clone()),
            None if name == self.active_profile_name() => Ok(Profile::default()),
            None => Err(ConfigError::UnknownProfile {
                profile: name.into(),
            }),
        }
    }

    /// Resolve and validate the engine configuration for a profile.
    pub fn engine_config(&self, profile: Option<&str>) -> Result<EngineConfig, ConfigError> {
        let profile = self.profile(profile)?;
        profile_to_engine_config(&profile, &self.defaults)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "qppd", "dryerlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("dryerlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, layered with the environment.
///
/// Nested keys use a double underscore, e.g.
/// `DRYERLINK_DEFAULTS__HISTORY_LIMIT=50`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DRYERLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build an `EngineConfig` from a profile over the global defaults.
pub fn profile_to_engine_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<EngineConfig, ConfigError> {
    let threshold = profile
        .offline_threshold_secs
        .unwrap_or(defaults.offline_threshold_secs);
    let history_limit = profile.history_limit.unwrap_or(defaults.history_limit);
    let setpoint_min = profile.setpoint_min.unwrap_or(defaults.setpoint_min);
    let setpoint_max = profile.setpoint_max.unwrap_or(defaults.setpoint_max);
    let event_capacity = profile.event_capacity.unwrap_or(defaults.event_capacity);

    if threshold == 0 {
        return Err(invalid("offline_threshold_secs", "must be greater than zero"));
    }
    if history_limit == 0 {
        return Err(invalid("history_limit", "must be greater than zero"));
    }
    if event_capacity == 0 {
        return Err(invalid("event_capacity", "must be greater than zero"));
    }
    if !setpoint_min.is_finite() || !setpoint_max.is_finite() || setpoint_min > setpoint_max {
        return Err(invalid(
            "setpoint",
            format!("expected min <= max, got {setpoint_min}..{setpoint_max}"),
        ));
    }

    Ok(EngineConfig {
        offline_threshold: Duration::from_secs(threshold),
        history_limit,
        setpoint_min,
        setpoint_max,
        event_capacity,
    })
}
