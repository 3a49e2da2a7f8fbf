//! Collection layer.
//!
//! One collection pass opens a single session, runs every group of one tier
//! through the scalar collector or table walker, merges the group outputs,
//! and distills a canonical device summary. A [`DeviceCollector`] owns one
//! repeating timer per active tier; the [`CollectorRegistry`] supervises at
//! most one collector per device.
//!
//! # Failure policy
//!
//! Metric-level faults never stop a device's scheduler:
//!
//! - a per-OID or per-element protocol error degrades one field, records
//!   its cause, and marks the pass `partial`
//! - a failed transform or row calculation degrades one value with a log
//! - a failed group marks the pass `partial` and records a cause
//! - a failed session open skips the pass and reports an error to the sink
//!
//! Only the registry's lifecycle operations return errors to callers.

mod device;
mod registry;
mod scalar;
mod summary;
mod table;
mod types;

pub use device::{DeviceCollector, PassError, collect_pass};
pub use registry::{CollectorRegistry, CollectorStatus, RegistryError};
pub use scalar::collect_scalars;
pub use summary::summarize;
pub use table::walk_table;
pub use types::{CollectionResult, GroupValues, HealthStatus, Row, Summary};
