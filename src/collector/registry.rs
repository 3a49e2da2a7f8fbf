//! Collector registry: process-wide device supervision.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::catalog::{Catalog, Tier};
use crate::config::{DeviceConfig, TierIntervals};
use crate::session::SessionFactory;
use crate::sink::ResultSink;

use super::device::DeviceCollector;

/// Lifecycle errors surfaced at the control-surface boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("collector already running for device '{0}'")]
    AlreadyRunning(String),

    #[error("no collector running for device '{0}'")]
    NotRunning(String),

    #[error("unknown device '{0}'")]
    UnknownDevice(String),

    #[error("device '{0}' is disabled")]
    Disabled(String),
}

/// Snapshot of one device's collector state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectorStatus {
    pub running: bool,
    pub tiers: Vec<Tier>,
}

/// Table of running device collectors, at most one per device identity.
///
/// Constructed once at process start and handed to whatever exposes the
/// control surface; the device->collector table is the only shared mutable
/// state, and one mutex serializes every start/stop so two concurrent
/// `start_for` calls can never register two collectors for one device.
/// Devices and their timers are otherwise fully independent.
pub struct CollectorRegistry {
    devices: HashMap<String, Arc<DeviceConfig>>,
    catalog: Arc<Catalog>,
    intervals: TierIntervals,
    factory: Arc<dyn SessionFactory>,
    sink: Arc<dyn ResultSink>,
    active: Mutex<HashMap<String, DeviceCollector>>,
}

impl CollectorRegistry {
    pub fn new(
        devices: Vec<DeviceConfig>,
        catalog: Catalog,
        intervals: TierIntervals,
        factory: Arc<dyn SessionFactory>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            devices: devices
                .into_iter()
                .map(|d| (d.id.clone(), Arc::new(d)))
                .collect(),
            catalog: Arc::new(catalog),
            intervals,
            factory,
            sink,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Start a collector for one device.
    ///
    /// Returns once the collector's timers are armed; the immediate first
    /// pass runs in the background and reports through the sink, so a dead
    /// device still starts successfully here. Starting twice is an
    /// [`RegistryError::AlreadyRunning`] error, not a duplicate collector.
    pub async fn start_for(&self, device_id: &str) -> Result<(), RegistryError> {
        let device = self
            .devices
            .get(device_id)
            .ok_or_else(|| RegistryError::UnknownDevice(device_id.to_string()))?;
        if !device.enabled {
            return Err(RegistryError::Disabled(device_id.to_string()));
        }

        let mut active = self.active.lock().await;
        if active.contains_key(device_id) {
            return Err(RegistryError::AlreadyRunning(device_id.to_string()));
        }

        let mut collector = DeviceCollector::new(
            Arc::clone(device),
            Arc::clone(&self.catalog),
            self.intervals,
            Arc::clone(&self.factory),
            Arc::clone(&self.sink),
        );
        collector.start();
        active.insert(device_id.to_string(), collector);

        tracing::info!(device = %device_id, "collector registered");
        Ok(())
    }

    /// Stop and remove one device's collector.
    pub async fn stop_for(&self, device_id: &str) -> Result<(), RegistryError> {
        let mut active = self.active.lock().await;
        let mut collector = active
            .remove(device_id)
            .ok_or_else(|| RegistryError::NotRunning(device_id.to_string()))?;
        collector.stop();

        tracing::info!(device = %device_id, "collector deregistered");
        Ok(())
    }

    /// Collector state for one device; an unknown or stopped device reports
    /// `running: false` with no tiers.
    pub async fn status_for(&self, device_id: &str) -> CollectorStatus {
        let active = self.active.lock().await;
        match active.get(device_id) {
            Some(collector) => CollectorStatus {
                running: collector.is_running(),
                tiers: collector.armed_tiers().to_vec(),
            },
            None => CollectorStatus {
                running: false,
                tiers: Vec::new(),
            },
        }
    }

    /// Device ids with a running collector, sorted.
    pub async fn list_active(&self) -> Vec<String> {
        let active = self.active.lock().await;
        let mut ids: Vec<String> = active.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Start every enabled auto-collect device.
    ///
    /// Individual start failures are logged and do not abort the remaining
    /// devices. Returns the number of collectors started.
    pub async fn initialize_all(&self) -> usize {
        let mut ids: Vec<&String> = self
            .devices
            .values()
            .filter(|d| d.enabled && d.auto_collect)
            .map(|d| &d.id)
            .collect();
        ids.sort_unstable();

        let mut started = 0;
        for id in ids {
            match self.start_for(id).await {
                Ok(()) => started += 1,
                Err(err) => {
                    tracing::error!(device = %id, error = %err, "auto-collect start failed");
                }
            }
        }

        tracing::info!(started, "collector initialization complete");
        started
    }

    /// Stop every registered collector; used for graceful termination.
    pub async fn shutdown_all(&self) {
        let mut active = self.active.lock().await;
        let count = active.len();
        for (_, mut collector) in active.drain() {
            collector.stop();
        }
        tracing::info!(count, "all collectors stopped");
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("devices", &self.devices.len())
            .field(
                "active",
                &self.active.try_lock().map(|a| a.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::session::{ProtocolSession, SessionError};
    use crate::sink::ChannelSink;

    /// Factory double: every session refuses, which is fine for lifecycle
    /// tests because start_for does not require a reachable device.
    struct UnreachableFactory;

    #[async_trait::async_trait]
    impl SessionFactory for UnreachableFactory {
        async fn open(
            &self,
            device: &DeviceConfig,
        ) -> Result<Box<dyn ProtocolSession>, SessionError> {
            Err(SessionError::Open {
                target: device.target(),
                reason: "unreachable".into(),
            })
        }
    }

    fn registry(devices: Vec<DeviceConfig>) -> CollectorRegistry {
        let (sink, rx) = ChannelSink::new();
        // Lifecycle tests don't consume outcomes
        drop(rx);
        CollectorRegistry::new(
            devices,
            default_catalog(),
            TierIntervals::default(),
            Arc::new(UnreachableFactory),
            Arc::new(sink),
        )
    }

    #[tokio::test]
    async fn test_double_start_errors_and_keeps_one_collector() {
        let registry = registry(vec![DeviceConfig::new("core-sw-1", "192.0.2.10")]);

        registry.start_for("core-sw-1").await.unwrap();
        let err = registry.start_for("core-sw-1").await.unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRunning("core-sw-1".into()));

        assert_eq!(registry.list_active().await, vec!["core-sw-1".to_string()]);
        let status = registry.status_for("core-sw-1").await;
        assert!(status.running);
        assert_eq!(
            status.tiers,
            vec![Tier::Fast, Tier::Standard, Tier::Slow]
        );
    }

    #[tokio::test]
    async fn test_stop_unregistered_is_an_error_without_side_effects() {
        let registry = registry(vec![DeviceConfig::new("core-sw-1", "192.0.2.10")]);

        let err = registry.stop_for("core-sw-1").await.unwrap_err();
        assert_eq!(err, RegistryError::NotRunning("core-sw-1".into()));
        assert!(registry.list_active().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_stop_cycle() {
        let registry = registry(vec![DeviceConfig::new("core-sw-1", "192.0.2.10")]);

        registry.start_for("core-sw-1").await.unwrap();
        registry.stop_for("core-sw-1").await.unwrap();

        let status = registry.status_for("core-sw-1").await;
        assert!(!status.running);
        assert!(status.tiers.is_empty());

        // A stopped device can be started again
        registry.start_for("core-sw-1").await.unwrap();
        assert_eq!(registry.list_active().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_disabled_devices_rejected() {
        let registry = registry(vec![
            DeviceConfig::new("core-sw-1", "192.0.2.10").with_enabled(false),
        ]);

        assert_eq!(
            registry.start_for("ghost").await.unwrap_err(),
            RegistryError::UnknownDevice("ghost".into())
        );
        assert_eq!(
            registry.start_for("core-sw-1").await.unwrap_err(),
            RegistryError::Disabled("core-sw-1".into())
        );
    }

    #[tokio::test]
    async fn test_initialize_all_skips_disabled_and_manual_devices() {
        let registry = registry(vec![
            DeviceConfig::new("auto-1", "10.0.0.1"),
            DeviceConfig::new("auto-2", "10.0.0.2"),
            DeviceConfig::new("manual-1", "10.0.0.3").with_auto_collect(false),
            DeviceConfig::new("off-1", "10.0.0.4").with_enabled(false),
        ]);

        let started = registry.initialize_all().await;
        assert_eq!(started, 2);
        assert_eq!(
            registry.list_active().await,
            vec!["auto-1".to_string(), "auto-2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_shutdown_all_empties_the_table() {
        let registry = registry(vec![
            DeviceConfig::new("auto-1", "10.0.0.1"),
            DeviceConfig::new("auto-2", "10.0.0.2"),
        ]);
        registry.initialize_all().await;

        registry.shutdown_all().await;
        assert!(registry.list_active().await.is_empty());
    }
}
