//! Periscope - SNMP device polling engine
//!
//! Periscope polls network devices over SNMP on a tiered schedule and turns
//! the raw varbinds into structured, summarized collection results. It can
//! be embedded as a library or run as the `periscope` binary.
//!
//! # Architecture
//!
//! - **Catalog**: declarative description of what to poll (scalar metric
//!   groups and table walks, grouped into fast/standard/slow tiers)
//! - **Session**: protocol access behind the [`session::ProtocolSession`]
//!   trait, with an SNMP v1/v2c implementation
//! - **Collector**: per-device collectors, one timer per tier, supervised
//!   by a [`collector::CollectorRegistry`]
//! - **Sink**: pass outcomes delivered through [`sink::ResultSink`]
//!   (channel for embedding, JSON-lines file for history)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use periscope::{AppConfig, CollectorRegistry, JsonlSink, SnmpSessionFactory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("configs/periscope.yaml")?;
//!     let sink = Arc::new(JsonlSink::open(&config.history_path)?);
//!
//!     let registry = CollectorRegistry::new(
//!         config.devices,
//!         periscope::catalog::default_catalog(),
//!         config.tiers,
//!         Arc::new(SnmpSessionFactory),
//!         sink,
//!     );
//!     registry.initialize_all().await;
//!
//!     tokio::signal::ctrl_c().await?;
//!     registry.shutdown_all().await;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod collector;
pub mod config;
pub mod session;
pub mod sink;

pub use catalog::{Catalog, Tier, default_catalog};
pub use collector::{CollectionResult, CollectorRegistry, CollectorStatus, RegistryError};
pub use config::{AppConfig, DeviceConfig, TierIntervals};
pub use session::{SessionFactory, SnmpSessionFactory};
pub use sink::{ChannelSink, JsonlSink, ResultSink};
