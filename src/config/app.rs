//! Application configuration structures.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::Tier;

use super::device::DeviceConfig;
use super::validation::ConfigError;

// =============================================================================
// Constants
// =============================================================================

/// Default fast tier interval (30 seconds).
pub const DEFAULT_FAST_INTERVAL: Duration = Duration::from_secs(30);

/// Default standard tier interval (2 minutes).
pub const DEFAULT_STANDARD_INTERVAL: Duration = Duration::from_secs(120);

/// Default slow tier interval (5 minutes).
pub const DEFAULT_SLOW_INTERVAL: Duration = Duration::from_secs(300);

/// Minimum allowed tier interval (1 second).
pub const MIN_TIER_INTERVAL: Duration = Duration::from_secs(1);

fn default_fast() -> Duration {
    DEFAULT_FAST_INTERVAL
}

fn default_standard() -> Duration {
    DEFAULT_STANDARD_INTERVAL
}

fn default_slow() -> Duration {
    DEFAULT_SLOW_INTERVAL
}

fn default_history_path() -> String {
    "periscope-history.jsonl".to_string()
}

// =============================================================================
// Tier intervals
// =============================================================================

/// Fixed polling interval per tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TierIntervals {
    /// Fast tier interval (default: 30s).
    #[serde(with = "humantime_serde")]
    pub fast: Duration,

    /// Standard tier interval (default: 2m).
    #[serde(with = "humantime_serde")]
    pub standard: Duration,

    /// Slow tier interval (default: 5m).
    #[serde(with = "humantime_serde")]
    pub slow: Duration,
}

impl Default for TierIntervals {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST_INTERVAL,
            standard: DEFAULT_STANDARD_INTERVAL,
            slow: DEFAULT_SLOW_INTERVAL,
        }
    }
}

impl TierIntervals {
    /// Interval for one tier.
    pub fn for_tier(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Fast => self.fast,
            Tier::Standard => self.standard,
            Tier::Slow => self.slow,
        }
    }

    /// Validate that every interval meets the minimum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in Tier::ALL {
            if self.for_tier(tier) < MIN_TIER_INTERVAL {
                return Err(ConfigError::Validation(format!(
                    "{tier} tier interval must be at least {MIN_TIER_INTERVAL:?}"
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Application configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tier polling intervals.
    #[serde(default)]
    pub tiers: TierIntervals,

    /// Devices to poll.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    /// Path of the JSON-lines history file the binary appends results to.
    #[serde(default = "default_history_path")]
    pub history_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tiers: TierIntervals::default(),
            devices: Vec::new(),
            history_path: default_history_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// Community strings have `${VAR}` references expanded and display
    /// names default to the device id.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        for device in &mut config.devices {
            device.finalize();
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` if any field is invalid or a
    /// device id is duplicated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tiers.validate()?;

        let mut seen = HashSet::new();
        for device in &self.devices {
            device.validate()?;
            if !seen.insert(device.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate device id '{}'",
                    device.id
                )));
            }
        }

        if self.history_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "history_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_interval_defaults() {
        let tiers = TierIntervals::default();
        assert_eq!(tiers.for_tier(Tier::Fast), Duration::from_secs(30));
        assert_eq!(tiers.for_tier(Tier::Standard), Duration::from_secs(120));
        assert_eq!(tiers.for_tier(Tier::Slow), Duration::from_secs(300));
        assert!(tiers.validate().is_ok());
    }

    #[test]
    fn test_tier_interval_minimum() {
        let tiers = TierIntervals {
            fast: Duration::from_millis(100),
            ..TierIntervals::default()
        };
        assert!(tiers.validate().is_err());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
tiers:
  fast: 10s
  standard: 1m
  slow: 10m
devices:
  - id: core-sw-1
    name: Core Switch
    host: 192.0.2.10
    community: ${PERISCOPE_MISSING_COMMUNITY:-public}
    timeout: 2s
  - id: edge-1
    host: 198.51.100.7
    version: v1
    auto_collect: false
history_path: /var/lib/periscope/history.jsonl
"#;
        let mut config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        for device in &mut config.devices {
            device.finalize();
        }
        config.validate().unwrap();

        assert_eq!(config.tiers.fast, Duration::from_secs(10));
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].community, "public");
        assert_eq!(config.devices[1].name, "edge-1");
        assert!(!config.devices[1].auto_collect);
    }

    #[test]
    fn test_duplicate_device_id_rejected() {
        let config = AppConfig {
            devices: vec![
                DeviceConfig::new("d1", "10.0.0.1"),
                DeviceConfig::new("d1", "10.0.0.2"),
            ],
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate device id"));
    }
}
