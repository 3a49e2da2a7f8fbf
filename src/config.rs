//! Configuration for the periscope polling engine.
//!
//! YAML-based configuration covering:
//! - Device records (address, protocol version, community, timeouts)
//! - Tier polling intervals
//! - History sink path for the binary

mod app;
mod device;
mod validation;

pub use app::{AppConfig, MIN_TIER_INTERVAL, TierIntervals};
pub use device::{DeviceConfig, SnmpVersion};
pub use validation::{ConfigError, expand_env_vars};
