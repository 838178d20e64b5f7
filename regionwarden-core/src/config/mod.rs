//! Engine configuration
//!
//! Environment-based configuration with defaults and validation. Every
//! variable is prefixed `REGIONWARDEN_`; unset variables keep their
//! defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Policy-engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Enforce the per-region teleport cooldown
    pub block_teleport_cooldown: bool,

    /// Cooldown window between teleports into one region
    #[serde(with = "humantime_serde")]
    pub teleport_cooldown: Duration,

    /// Keep logins disabled until explicitly enabled
    pub start_with_logins_disabled: bool,

    /// Apply landing-point rules to region crossings as if they were
    /// teleports
    pub force_landing_points_on_crossing: bool,

    /// Enforce region maturity ratings
    pub check_maturity_level: bool,

    /// Substrings matched against display names and source addresses; any
    /// hit denies entry
    pub ban_criteria: Vec<String>,

    /// Budget for one presence-directory query
    #[serde(with = "humantime_serde")]
    pub presence_timeout: Duration,

    /// Budget for one reverse-DNS resolution
    #[serde(with = "humantime_serde")]
    pub dns_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            block_teleport_cooldown: true,
            teleport_cooldown: Duration::from_secs(3),
            start_with_logins_disabled: false,
            force_landing_points_on_crossing: false,
            check_maturity_level: true,
            ban_criteria: Vec::new(),
            presence_timeout: Duration::from_secs(5),
            dns_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = EngineConfig::default();

        if let Some(v) = read_bool("REGIONWARDEN_BLOCK_TELEPORT_COOLDOWN")? {
            config.block_teleport_cooldown = v;
        }
        if let Some(v) = read_secs("REGIONWARDEN_TELEPORT_COOLDOWN_SECS")? {
            config.teleport_cooldown = v;
        }
        if let Some(v) = read_bool("REGIONWARDEN_START_DISABLED")? {
            config.start_with_logins_disabled = v;
        }
        if let Some(v) = read_bool("REGIONWARDEN_FORCE_LANDING_POINTS_ON_CROSSING")? {
            config.force_landing_points_on_crossing = v;
        }
        if let Some(v) = read_bool("REGIONWARDEN_CHECK_MATURITY_LEVEL")? {
            config.check_maturity_level = v;
        }
        if let Ok(raw) = env::var("REGIONWARDEN_BAN_CRITERIA") {
            config.ban_criteria = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = read_secs("REGIONWARDEN_PRESENCE_TIMEOUT_SECS")? {
            config.presence_timeout = v;
        }
        if let Some(v) = read_secs("REGIONWARDEN_DNS_TIMEOUT_SECS")? {
            config.dns_timeout = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.presence_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "presence_timeout".to_string(),
                value: "0".to_string(),
            });
        }
        if self.dns_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "dns_timeout".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Cooldown window in whole seconds, as stored in region state
    pub fn teleport_cooldown_secs(&self) -> i64 {
        self.teleport_cooldown.as_secs() as i64
    }
}

fn read_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<bool>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: raw }),
        Err(_) => Ok(None),
    }
}

fn read_secs(key: &str) -> Result<Option<Duration>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: raw }),
        Err(_) => Ok(None),
    }
}
