//! Per-device polling configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigError, expand_env_vars};

/// Default SNMP agent port.
const DEFAULT_PORT: u16 = 161;

/// Default per-request timeout (5 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default retry count for timed-out requests.
const DEFAULT_RETRIES: u8 = 1;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_community() -> String {
    "public".to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_retries() -> u8 {
    DEFAULT_RETRIES
}

fn default_enabled() -> bool {
    true
}

/// SNMP protocol version.
///
/// `V3` parses for forward compatibility but the session factory rejects
/// it until USM support lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnmpVersion {
    #[serde(rename = "v1")]
    V1,
    #[default]
    #[serde(rename = "v2c")]
    V2c,
    #[serde(rename = "v3")]
    V3,
}

impl fmt::Display for SnmpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpVersion::V1 => f.write_str("v1"),
            SnmpVersion::V2c => f.write_str("v2c"),
            SnmpVersion::V3 => f.write_str("v3"),
        }
    }
}

/// Configuration for one polled device.
///
/// Immutable for the lifetime of a collector instance; changing a device's
/// configuration requires stop + start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Opaque device identity; unique across the registry.
    pub id: String,
    /// Display name (defaults to the id when omitted).
    #[serde(default)]
    pub name: String,
    /// Device hostname or IP address.
    pub host: String,
    /// SNMP agent port (default: 161).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Protocol version (default: v2c).
    #[serde(default)]
    pub version: SnmpVersion,
    /// Community string; `${VAR}` / `${VAR:-default}` are expanded at load.
    #[serde(default = "default_community")]
    pub community: String,
    /// Per-request timeout (default: 5s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Retries for timed-out requests (default: 1).
    #[serde(default = "default_retries")]
    pub retries: u8,
    /// Enable this device (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Start this device automatically at process startup (default: true).
    #[serde(default = "default_enabled")]
    pub auto_collect: bool,
    /// Static tags carried into every collection result.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl DeviceConfig {
    /// Create a new device configuration with defaults.
    pub fn new(id: impl Into<String>, host: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            host: host.into(),
            port: DEFAULT_PORT,
            version: SnmpVersion::default(),
            community: default_community(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            enabled: true,
            auto_collect: true,
            tags: BTreeMap::new(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the agent port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the protocol version.
    pub fn with_version(mut self, version: SnmpVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the community string.
    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = community.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    /// Set enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set auto-collect.
    pub fn with_auto_collect(mut self, auto_collect: bool) -> Self {
        self.auto_collect = auto_collect;
        self
    }

    /// Transport target string.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Expand environment references in the community string and default
    /// the display name to the id. Called once at config load.
    pub(crate) fn finalize(&mut self) {
        self.community = expand_env_vars(&self.community);
        if self.name.is_empty() {
            self.name = self.id.clone();
        }
    }

    /// Validate the device record.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Validation("device id must not be empty".into()));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "device '{}': host must not be empty",
                self.id
            )));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation(format!(
                "device '{}': port must be non-zero",
                self.id
            )));
        }
        if self.timeout < Duration::from_millis(100) {
            return Err(ConfigError::Validation(format!(
                "device '{}': timeout must be at least 100ms",
                self.id
            )));
        }
        Ok(())
    }
}
