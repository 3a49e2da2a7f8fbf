//! Canonical collection result types.
//!
//! A [`CollectionResult`] is produced fresh on every pass, is immutable once
//! built, and moves into the sink. The serialized form uses camelCase keys,
//! matching the history store's document format.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{RowFields, ScalarValue, Tier};

/// One reconstructed table row, keyed by the numeric row index of the
/// protocol table. Ephemeral: rebuilt every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub index: u32,
    pub fields: RowFields,
}

/// Output of one metric group: a scalar mapping or an ordered row sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupValues {
    Scalars(BTreeMap<String, Option<ScalarValue>>),
    Rows(Vec<Row>),
}

/// Overall health of one collection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every group collected cleanly.
    Ok,
    /// At least one group failed; the rest of the pass is usable.
    Partial,
    /// The device could not be polled at all.
    Error,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Ok => f.write_str("ok"),
            HealthStatus::Partial => f.write_str("partial"),
            HealthStatus::Error => f.write_str("error"),
        }
    }
}

/// Canonical per-device summary distilled from raw group results.
///
/// All value fields are optional: absence of an input leaves the field
/// empty rather than failing the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub disk_usage: Option<f64>,
    pub temperature: Option<f64>,
    pub uptime_seconds: Option<f64>,
    pub status: HealthStatus,
    /// Human-readable causes for every group failure, in collection order.
    pub errors: Vec<String>,
}

/// The product of one collection pass for one device-tier pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResult {
    pub device_id: String,
    pub device_name: String,
    pub address: String,
    pub tier: Tier,
    pub ts: DateTime<Utc>,
    /// Static tags copied from the device configuration.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Group name to group output.
    pub metrics: BTreeMap<String, GroupValues>,
    pub summary: Summary,
}
