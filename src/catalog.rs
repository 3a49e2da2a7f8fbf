//! Declarative metric catalog.
//!
//! The catalog is pure data: scalar metric groups and indexed table groups,
//! each assigned to exactly one polling tier. Collection logic never changes
//! when groups are added or removed; it only iterates what the catalog
//! declares.
//!
//! - [`MetricDefinition`] / [`TableDefinition`]: what to fetch and how to
//!   decode it
//! - [`Transform`], [`RowCalc`], [`RowFilter`]: enumerated post-processing
//!   attached to definitions (no dynamic dispatch)
//! - [`Catalog`]: lookup by group name and tier membership enumeration
//! - [`default_catalog`]: the built-in group set (system identity, CPU,
//!   storage, interfaces, temperature)

mod groups;
mod types;
mod value;

pub use groups::{
    INTERFACE_TABLE, RESOURCE_METRICS, STORAGE_TABLE, SYSTEM_METRICS, TEMPERATURE_METRICS,
    default_catalog,
};
pub use types::{
    CalcError, Catalog, ColumnDefinition, FilterError, GroupSpec, MetricDefinition, MetricGroup,
    MetricKind, RowCalc, RowFilter, TableDefinition, Tier, Transform, TransformError,
};
pub use value::{RowFields, ScalarValue};
