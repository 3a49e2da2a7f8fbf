//! Metric aggregation into the canonical device summary.

use std::collections::BTreeMap;

use crate::catalog::ScalarValue;

use super::types::{GroupValues, HealthStatus, Row, Summary};

/// Distill merged group outputs into a [`Summary`].
///
/// Pure function: each rule is applied independently and a missing input
/// leaves its summary field empty.
///
/// Memory and disk usage are looked up by matching substrings of the
/// storage row description ("memory"/"ram", "disk"/"flash"/"drive"). This
/// heuristic is inherited from the field-proven catalog and is a known
/// approximation: vendor firmware wording varies, and a row a vendor labels
/// unusually will not be picked up. It is deliberately not "fixed" here.
pub fn summarize(metrics: &BTreeMap<String, GroupValues>, errors: &[String]) -> Summary {
    Summary {
        cpu_usage: scalar_value(metrics, "resources", "cpuUsage"),
        memory_usage: storage_usage(metrics, &["memory", "ram"]),
        disk_usage: storage_usage(metrics, &["disk", "flash", "drive"]),
        temperature: scalar_value(metrics, "temperature", "boardTemperature")
            .or_else(|| scalar_value(metrics, "temperature", "cpuTemperature")),
        uptime_seconds: scalar_value(metrics, "system", "sysUpTime"),
        status: if errors.is_empty() {
            HealthStatus::Ok
        } else {
            HealthStatus::Partial
        },
        errors: errors.to_vec(),
    }
}

fn scalar_value(metrics: &BTreeMap<String, GroupValues>, group: &str, name: &str) -> Option<f64> {
    match metrics.get(group)? {
        GroupValues::Scalars(values) => values.get(name)?.as_ref()?.as_f64(),
        GroupValues::Rows(_) => None,
    }
}

/// Usage percent of the first storage row whose description contains one
/// of the needles (case-insensitive). Absent when no row matches or the
/// matching row has no numeric percent.
fn storage_usage(metrics: &BTreeMap<String, GroupValues>, needles: &[&str]) -> Option<f64> {
    let GroupValues::Rows(rows) = metrics.get("storage")? else {
        return None;
    };
    rows.iter()
        .find(|row| descr_matches(row, needles))
        .and_then(|row| row.fields.get("storageUsagePercent")?.as_ref()?.as_f64())
}

fn descr_matches(row: &Row, needles: &[&str]) -> bool {
    let Some(Some(ScalarValue::Text(descr))) = row.fields.get("storageDescr") else {
        return false;
    };
    let lower = descr.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}
