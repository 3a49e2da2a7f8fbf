//! Catalog definition types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value::{RowFields, ScalarValue};

// =============================================================================
// Tiers
// =============================================================================

/// Polling cadence a metric group is assigned to.
///
/// Every group declares exactly one tier; a device collector arms one timer
/// per tier that has at least one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Standard,
    Slow,
}

impl Tier {
    /// All tiers in scheduling order.
    pub const ALL: [Tier; 3] = [Tier::Fast, Tier::Standard, Tier::Slow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Standard => "standard",
            Tier::Slow => "slow",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transforms
// =============================================================================

/// Value post-processing attached to a metric or column definition.
///
/// Enumerated rather than stored as function values so the catalog stays
/// plain const data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Multiply a numeric value by a constant factor.
    Scale(f64),
    /// Convert SNMP timeticks (hundredths of a second) to seconds.
    TicksToSeconds,
    /// Strip trailing NULs and surrounding whitespace from text.
    Trim,
}

/// A transform was applied to a value of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("expected a numeric value, got {0}")]
    NonNumeric(&'static str),
    #[error("expected a text value, got {0}")]
    NonText(&'static str),
}

impl Transform {
    /// Apply the transform, consuming the input value.
    pub fn apply(&self, value: ScalarValue) -> Result<ScalarValue, TransformError> {
        match self {
            Transform::Scale(factor) => {
                let n = value
                    .as_f64()
                    .ok_or(TransformError::NonNumeric(value.kind()))?;
                Ok(ScalarValue::Float(n * factor))
            }
            Transform::TicksToSeconds => {
                let n = value
                    .as_f64()
                    .ok_or(TransformError::NonNumeric(value.kind()))?;
                Ok(ScalarValue::Float(n / 100.0))
            }
            Transform::Trim => match value {
                ScalarValue::Text(s) => {
                    Ok(ScalarValue::Text(s.trim_end_matches('\0').trim().to_string()))
                }
                other => Err(TransformError::NonText(other.kind())),
            },
        }
    }
}

// =============================================================================
// Scalar metrics
// =============================================================================

/// Semantic type of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    String,
    Gauge,
    Counter,
}

/// One scalar metric fetched by exact OID.
#[derive(Debug, Clone, Copy)]
pub struct MetricDefinition {
    pub name: &'static str,
    pub oid: &'static str,
    pub kind: MetricKind,
    pub transform: Option<Transform>,
    pub help: &'static str,
}

// =============================================================================
// Tables
// =============================================================================

/// One decoded column of a conceptual table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinition {
    pub name: &'static str,
    /// Column position in the table entry OID (second-to-last component).
    pub column: u32,
    pub kind: MetricKind,
    pub transform: Option<Transform>,
}

/// Derived-field calculation applied to each accumulated row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowCalc {
    /// `output = used / total * 100`. A zero or absent total skips the
    /// output field without failing the row.
    UsagePercent {
        used: &'static str,
        total: &'static str,
        output: &'static str,
    },
}

/// A row calculation could not be evaluated. The row is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("field '{0}' is missing")]
    MissingField(&'static str),
    #[error("field '{field}' is not numeric ({kind})")]
    NonNumeric { field: &'static str, kind: &'static str },
}

impl RowCalc {
    /// Evaluate against a row, yielding the derived field if applicable.
    pub fn eval(
        &self,
        fields: &RowFields,
    ) -> Result<Option<(&'static str, ScalarValue)>, CalcError> {
        match self {
            RowCalc::UsagePercent {
                used,
                total,
                output,
            } => {
                let used_v = numeric_field(fields, used)?;
                let total_v = numeric_field(fields, total)?;
                if total_v <= 0.0 {
                    return Ok(None);
                }
                Ok(Some((
                    output,
                    ScalarValue::Float(used_v / total_v * 100.0),
                )))
            }
        }
    }
}

/// Row inclusion predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowFilter {
    /// Keep rows whose text field contains any needle, case-insensitive.
    DescrContainsAny {
        field: &'static str,
        needles: &'static [&'static str],
    },
    /// Keep rows whose integer field equals the given value.
    FieldEqualsInt { field: &'static str, value: i64 },
}

/// A filter predicate could not be evaluated.
///
/// The walker treats this as fail-open: the row is included anyway, so a
/// corrupt predicate cannot silently hide inventory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("field '{0}' is missing")]
    MissingField(&'static str),
    #[error("field '{field}' has unexpected kind {kind}")]
    WrongKind { field: &'static str, kind: &'static str },
}

impl RowFilter {
    /// Evaluate the predicate against a row.
    pub fn eval(&self, fields: &RowFields) -> Result<bool, FilterError> {
        match self {
            RowFilter::DescrContainsAny { field, needles } => {
                let value = present_field(fields, field)?;
                let text = value.as_text().ok_or(FilterError::WrongKind {
                    field,
                    kind: value.kind(),
                })?;
                let lower = text.to_lowercase();
                Ok(needles.iter().any(|n| lower.contains(n)))
            }
            RowFilter::FieldEqualsInt { field, value } => {
                let actual = present_field(fields, field)?;
                let n = match actual {
                    ScalarValue::Int(v) => *v,
                    ScalarValue::Uint(v) => i64::try_from(*v).map_err(|_| {
                        FilterError::WrongKind {
                            field,
                            kind: actual.kind(),
                        }
                    })?,
                    other => {
                        return Err(FilterError::WrongKind {
                            field,
                            kind: other.kind(),
                        });
                    }
                };
                Ok(n == *value)
            }
        }
    }
}

/// One conceptual table, addressed by walking a subtree whose trailing OID
/// components encode (column, row index).
#[derive(Debug, Clone, Copy)]
pub struct TableDefinition {
    pub name: &'static str,
    /// Entry OID of the table; walked as a subtree.
    pub base_oid: &'static str,
    pub columns: &'static [ColumnDefinition],
    pub calc: Option<RowCalc>,
    pub filter: Option<RowFilter>,
}

impl TableDefinition {
    /// Look up a column by its position in the entry OID.
    pub fn column(&self, column: u32) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.column == column)
    }
}

// =============================================================================
// Groups and catalog
// =============================================================================

/// What a metric group fetches: a batch of scalars or one table.
#[derive(Debug, Clone, Copy)]
pub enum GroupSpec {
    Scalars(&'static [MetricDefinition]),
    Table(TableDefinition),
}

/// A named metric group bound to one polling tier.
#[derive(Debug, Clone, Copy)]
pub struct MetricGroup {
    pub name: &'static str,
    pub tier: Tier,
    pub spec: GroupSpec,
}

/// Read-only set of metric groups, shared across all devices and polls.
#[derive(Debug, Clone)]
pub struct Catalog {
    groups: Vec<MetricGroup>,
}

impl Catalog {
    pub fn new(groups: Vec<MetricGroup>) -> Self {
        Self { groups }
    }

    /// Look up a group by name.
    pub fn group(&self, name: &str) -> Option<&MetricGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn groups(&self) -> &[MetricGroup] {
        &self.groups
    }

    /// Groups belonging to one tier, in declaration order.
    pub fn groups_for_tier(&self, tier: Tier) -> Vec<&MetricGroup> {
        self.groups.iter().filter(|g| g.tier == tier).collect()
    }

    /// Tiers that have at least one group, in scheduling order.
    pub fn active_tiers(&self) -> Vec<Tier> {
        Tier::ALL
            .into_iter()
            .filter(|t| self.groups.iter().any(|g| g.tier == *t))
            .collect()
    }
}

fn numeric_field(fields: &RowFields, name: &'static str) -> Result<f64, CalcError> {
    let value = fields
        .get(name)
        .and_then(|v| v.as_ref())
        .ok_or(CalcError::MissingField(name))?;
    value.as_f64().ok_or(CalcError::NonNumeric {
        field: name,
        kind: value.kind(),
    })
}

fn present_field<'a>(
    fields: &'a RowFields,
    name: &'static str,
) -> Result<&'a ScalarValue, FilterError> {
    fields
        .get(name)
        .and_then(|v| v.as_ref())
        .ok_or(FilterError::MissingField(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: &[(&str, Option<ScalarValue>)]) -> RowFields {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_ticks_to_seconds() {
        let out = Transform::TicksToSeconds
            .apply(ScalarValue::Uint(12345))
            .unwrap();
        assert_eq!(out, ScalarValue::Float(123.45));
    }

    #[test]
    fn test_scale() {
        let out = Transform::Scale(0.001)
            .apply(ScalarValue::Int(42500))
            .unwrap();
        assert_eq!(out, ScalarValue::Float(42.5));
    }

    #[test]
    fn test_scale_rejects_text() {
        let err = Transform::Scale(2.0)
            .apply(ScalarValue::Text("n/a".into()))
            .unwrap_err();
        assert_eq!(err, TransformError::NonNumeric("text"));
    }

    #[test]
    fn test_trim() {
        let out = Transform::Trim
            .apply(ScalarValue::Text("  eth0\0\0".into()))
            .unwrap();
        assert_eq!(out, ScalarValue::Text("eth0".into()));
    }

    #[test]
    fn test_usage_percent() {
        let calc = RowCalc::UsagePercent {
            used: "used",
            total: "size",
            output: "pct",
        };
        let fields = row(&[
            ("used", Some(ScalarValue::Uint(250))),
            ("size", Some(ScalarValue::Uint(1000))),
        ]);
        let (name, value) = calc.eval(&fields).unwrap().unwrap();
        assert_eq!(name, "pct");
        assert_eq!(value, ScalarValue::Float(25.0));
    }

    #[test]
    fn test_usage_percent_zero_total() {
        let calc = RowCalc::UsagePercent {
            used: "used",
            total: "size",
            output: "pct",
        };
        let fields = row(&[
            ("used", Some(ScalarValue::Uint(0))),
            ("size", Some(ScalarValue::Uint(0))),
        ]);
        assert_eq!(calc.eval(&fields).unwrap(), None);
    }

    #[test]
    fn test_usage_percent_missing_field() {
        let calc = RowCalc::UsagePercent {
            used: "used",
            total: "size",
            output: "pct",
        };
        let fields = row(&[("used", Some(ScalarValue::Uint(10)))]);
        assert_eq!(calc.eval(&fields).unwrap_err(), CalcError::MissingField("size"));
    }

    #[test]
    fn test_descr_filter_case_insensitive() {
        let filter = RowFilter::DescrContainsAny {
            field: "descr",
            needles: &["disk", "flash"],
        };
        let hit = row(&[("descr", Some(ScalarValue::Text("System Disk".into())))]);
        let miss = row(&[("descr", Some(ScalarValue::Text("Swap space".into())))]);
        assert!(filter.eval(&hit).unwrap());
        assert!(!filter.eval(&miss).unwrap());
    }

    #[test]
    fn test_filter_wrong_kind_is_error() {
        let filter = RowFilter::FieldEqualsInt {
            field: "oper",
            value: 1,
        };
        let fields = row(&[("oper", Some(ScalarValue::Text("up".into())))]);
        assert!(matches!(
            filter.eval(&fields),
            Err(FilterError::WrongKind { field: "oper", .. })
        ));
    }

    #[test]
    fn test_catalog_tier_partition() {
        let catalog = crate::catalog::default_catalog();
        assert_eq!(
            catalog.active_tiers(),
            vec![Tier::Fast, Tier::Standard, Tier::Slow]
        );
        let fast: Vec<&str> = catalog
            .groups_for_tier(Tier::Fast)
            .iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(fast, vec!["resources", "temperature"]);
    }
}
