//! Configuration file parsing and structures.
//!
//! powerflow reads a single TOML file at startup. The configuration is
//! immutable once loaded.

use std::collections::HashMap;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::translate::Limits;
use crate::translate::Role;
use crate::translate::Translator;

/// Top-level configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Wattage that renders as a full bar
    pub max_watts: u32,

    #[serde(default)]
    pub logging: LoggingConfig,

    pub hub: HubConfig,

    pub sensors: SensorsConfig,

    pub battery: BatteryConfig,

    /// Display API; disabled when the section is absent
    #[serde(default)]
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"powerflow::hub" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Build the subscriber filter for these settings.
    pub fn targets(&self) -> Targets {
        self.overrides.iter().fold(
            Targets::new().with_default(LevelFilter::from(self.level)),
            |targets, (target, level)| targets.with_target(target.clone(), LevelFilter::from(*level)),
        )
    }
}

/// Home Assistant connection settings
#[derive(Debug, Deserialize)]
pub struct HubConfig {
    /// Base URL, e.g. `http://homeassistant.local:8123`
    pub url: String,

    /// Long-lived access token
    pub token: String,
}

/// Entity ids for each displayed sensor
#[derive(Debug, Deserialize)]
pub struct SensorsConfig {
    pub load: String,
    pub pv: String,
    pub battery: String,
    pub battery_soc: String,
    pub grid: String,
    pub grid_frequency: String,
}

impl SensorsConfig {
    pub fn entities(&self) -> [(Role, &str); 6] {
        [
            (Role::Load, self.load.as_str()),
            (Role::Pv, self.pv.as_str()),
            (Role::Battery, self.battery.as_str()),
            (Role::BatterySoc, self.battery_soc.as_str()),
            (Role::Grid, self.grid.as_str()),
            (Role::GridFrequency, self.grid_frequency.as_str()),
        ]
    }
}

/// State-of-charge thresholds, in percent
#[derive(Debug, Deserialize)]
pub struct BatteryConfig {
    pub warning: u8,
    pub low: u8,
}

/// Display HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8565
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.max_watts == 0 {
            errors.push("max_watts must be greater than zero".to_string());
        }

        if self.battery.low > self.battery.warning {
            errors.push(format!(
                "battery.low ({}) must not exceed battery.warning ({})",
                self.battery.low, self.battery.warning
            ));
        }

        let mut seen = HashSet::new();
        for (role, entity_id) in self.sensors.entities() {
            if entity_id.trim().is_empty() {
                errors.push(format!("sensors.{} must not be empty", role));
            } else if !seen.insert(entity_id) {
                errors.push(format!(
                    "sensors.{} reuses entity id '{}'",
                    role, entity_id
                ));
            }
        }

        match reqwest::Url::parse(&self.hub.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "hub.url must use http or https, not '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!("hub.url is invalid: {}", e)),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Numeric display policy
    pub fn limits(&self) -> Result<Limits, ConfigError> {
        let max_watts = NonZeroU32::new(self.max_watts).ok_or_else(|| {
            ConfigError::Validation(vec!["max_watts must be greater than zero".to_string()])
        })?;

        Ok(Limits {
            max_watts,
            battery_warning_pct: i64::from(self.battery.warning),
            battery_low_pct: i64::from(self.battery.low),
        })
    }

    /// Build the value translator for the configured sensors
    pub fn translator(&self) -> Result<Translator, ConfigError> {
        Ok(Translator::new(self.sensors.entities(), self.limits()?))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),
}
