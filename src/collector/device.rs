//! Per-device collection scheduling.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::catalog::{Catalog, GroupSpec, MetricGroup, Tier};
use crate::config::{DeviceConfig, TierIntervals};
use crate::session::{ProtocolSession, SessionError, SessionFactory};
use crate::sink::ResultSink;

use super::scalar::collect_scalars;
use super::summary::summarize;
use super::table::walk_table;
use super::types::{CollectionResult, GroupValues};

/// Session acquisition failed for an entire pass.
///
/// Reported to the sink; the device's collector keeps running and the next
/// tick fires at the unchanged interval.
#[derive(Debug, Error)]
#[error("collection pass failed for device '{device_id}' ({tier} tier): {source}")]
pub struct PassError {
    pub device_id: String,
    pub tier: Tier,
    #[source]
    pub source: SessionError,
}

/// Runs one full collection pass over `groups` using one shared session.
///
/// The caller opens the session once and drops it once after this returns,
/// even on partial failure. Failures are absorbed at two levels: a failed
/// scalar batch or table walk leaves an empty group result and a recorded
/// cause, and a per-OID or per-element protocol error inside a surviving
/// group records its own cause. Either way the summary becomes `partial`.
pub async fn collect_pass(
    session: &mut (dyn ProtocolSession + '_),
    device: &DeviceConfig,
    tier: Tier,
    groups: &[&MetricGroup],
) -> CollectionResult {
    let mut metrics = BTreeMap::new();
    let mut errors = Vec::new();

    for group in groups {
        match &group.spec {
            GroupSpec::Scalars(defs) => match collect_scalars(session, defs).await {
                Ok((values, mut group_errors)) => {
                    metrics.insert(group.name.to_string(), GroupValues::Scalars(values));
                    errors.append(&mut group_errors);
                }
                Err(err) => {
                    tracing::warn!(
                        device = %device.id,
                        group = group.name,
                        error = %err,
                        "scalar group failed"
                    );
                    metrics.insert(
                        group.name.to_string(),
                        GroupValues::Scalars(BTreeMap::new()),
                    );
                    errors.push(format!("{}: {err}", group.name));
                }
            },
            GroupSpec::Table(table) => match walk_table(session, table).await {
                Ok((rows, mut group_errors)) => {
                    metrics.insert(group.name.to_string(), GroupValues::Rows(rows));
                    errors.append(&mut group_errors);
                }
                Err(err) => {
                    tracing::warn!(
                        device = %device.id,
                        group = group.name,
                        error = %err,
                        "table group failed"
                    );
                    metrics.insert(group.name.to_string(), GroupValues::Rows(Vec::new()));
                    errors.push(format!("{}: {err}", group.name));
                }
            },
        }
    }

    let summary = summarize(&metrics, &errors);
    CollectionResult {
        device_id: device.id.clone(),
        device_name: device.name.clone(),
        address: device.target(),
        tier,
        ts: Utc::now(),
        tags: device.tags.clone(),
        metrics,
        summary,
    }
}

/// Per-device runtime unit owning one repeating timer per active tier.
///
/// `Stopped -> Running -> Stopped`. Starting arms one task per tier that
/// has at least one catalog group; every task performs an immediate first
/// pass and then repeats at the tier's fixed interval. Stopping is
/// edge-triggered: future ticks are prevented, but a pass already in
/// flight completes and still reaches the sink.
pub struct DeviceCollector {
    device: Arc<DeviceConfig>,
    catalog: Arc<Catalog>,
    intervals: TierIntervals,
    factory: Arc<dyn SessionFactory>,
    sink: Arc<dyn ResultSink>,
    stop_tx: Option<watch::Sender<bool>>,
    armed_tiers: Vec<Tier>,
}

impl DeviceCollector {
    pub fn new(
        device: Arc<DeviceConfig>,
        catalog: Arc<Catalog>,
        intervals: TierIntervals,
        factory: Arc<dyn SessionFactory>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            device,
            catalog,
            intervals,
            factory,
            sink,
            stop_tx: None,
            armed_tiers: Vec::new(),
        }
    }

    /// Arm one repeating timer per non-empty tier. No-op when already
    /// running.
    pub fn start(&mut self) {
        if self.stop_tx.is_some() {
            return;
        }

        let (stop_tx, _) = watch::channel(false);
        let tiers = self.catalog.active_tiers();
        for tier in &tiers {
            tokio::spawn(run_tier(
                Arc::clone(&self.device),
                Arc::clone(&self.catalog),
                *tier,
                self.intervals,
                Arc::clone(&self.factory),
                Arc::clone(&self.sink),
                stop_tx.subscribe(),
            ));
        }

        tracing::info!(
            device = %self.device.id,
            tiers = ?tiers,
            "device collector started"
        );
        self.stop_tx = Some(stop_tx);
        self.armed_tiers = tiers;
    }

    /// Clear every armed timer. Idempotent.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            self.armed_tiers.clear();
            tracing::info!(device = %self.device.id, "device collector stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    /// Tiers with an armed timer, in scheduling order.
    pub fn armed_tiers(&self) -> &[Tier] {
        &self.armed_tiers
    }

    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }
}

impl Drop for DeviceCollector {
    fn drop(&mut self) {
        // Dropping the watch sender also releases the tier tasks.
        self.stop();
    }
}

impl std::fmt::Debug for DeviceCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCollector")
            .field("device", &self.device.id)
            .field("running", &self.is_running())
            .field("armed_tiers", &self.armed_tiers)
            .finish_non_exhaustive()
    }
}

/// One tier's repeating collection loop.
///
/// The first tick completes immediately (fire-on-start). Passes run inline
/// in this task, so two ticks of the same device-tier pair can never
/// overlap; a pass outlasting the interval delays the next tick instead.
async fn run_tier(
    device: Arc<DeviceConfig>,
    catalog: Arc<Catalog>,
    tier: Tier,
    intervals: TierIntervals,
    factory: Arc<dyn SessionFactory>,
    sink: Arc<dyn ResultSink>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(intervals.for_tier(tier));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_pass(&device, &catalog, tier, factory.as_ref(), sink.as_ref()).await;
            }
            // Stop signal, or the collector itself was dropped.
            _ = stop_rx.changed() => break,
        }
        if *stop_rx.borrow() {
            break;
        }
    }
    tracing::debug!(device = %device.id, %tier, "tier loop exited");
}

/// One tick: open a session, collect the tier's groups, deliver.
async fn run_pass(
    device: &DeviceConfig,
    catalog: &Catalog,
    tier: Tier,
    factory: &dyn SessionFactory,
    sink: &dyn ResultSink,
) {
    let groups = catalog.groups_for_tier(tier);

    match factory.open(device).await {
        Ok(mut session) => {
            let result = collect_pass(session.as_mut(), device, tier, &groups).await;
            // Session drops here: exactly one release per open, even when
            // some groups failed.
            drop(session);
            sink.deliver(Ok(result)).await;
        }
        Err(err) => {
            tracing::warn!(device = %device.id, %tier, error = %err, "session open failed");
            sink.deliver(Err(PassError {
                device_id: device.id.clone(),
                tier,
                source: err,
            }))
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::collector::HealthStatus;
    use crate::session::{Varbind, VarbindError, WireValue};
    use crate::sink::ChannelSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Factory double handing out scripted sessions and counting opens.
    struct MockFactory {
        opens: AtomicUsize,
        refuse: bool,
        system_times_out: bool,
        no_sensors: bool,
    }

    impl MockFactory {
        fn new() -> Self {
            Self {
                opens: AtomicUsize::new(0),
                refuse: false,
                system_times_out: false,
                no_sensors: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl SessionFactory for MockFactory {
        async fn open(
            &self,
            device: &DeviceConfig,
        ) -> Result<Box<dyn ProtocolSession>, SessionError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(SessionError::Open {
                    target: device.target(),
                    reason: "host unreachable".into(),
                });
            }
            Ok(Box::new(ScriptedSession {
                system_times_out: self.system_times_out,
                no_sensors: self.no_sensors,
            }))
        }
    }

    struct ScriptedSession {
        system_times_out: bool,
        no_sensors: bool,
    }

    impl ScriptedSession {
        fn answer(&self, oid: &str) -> Result<WireValue, VarbindError> {
            match oid {
                "1.3.6.1.2.1.1.1.0" => Ok(WireValue::OctetString(b"test router".to_vec())),
                "1.3.6.1.2.1.1.3.0" => Ok(WireValue::Timeticks(12345)),
                "1.3.6.1.2.1.1.4.0" => Ok(WireValue::OctetString(b"noc".to_vec())),
                "1.3.6.1.2.1.1.5.0" => Ok(WireValue::OctetString(b"r1".to_vec())),
                "1.3.6.1.2.1.1.6.0" => Ok(WireValue::OctetString(b"lab".to_vec())),
                "1.3.6.1.4.1.2021.11.9.0" => Ok(WireValue::Gauge32(42)),
                "1.3.6.1.4.1.2021.4.5.0" => Ok(WireValue::Gauge32(8000)),
                "1.3.6.1.4.1.2021.4.6.0" => Ok(WireValue::Gauge32(4000)),
                "1.3.6.1.4.1.2021.13.16.2.1.3.1" | "1.3.6.1.4.1.2021.13.16.2.1.3.2"
                    if !self.no_sensors =>
                {
                    Ok(WireValue::Gauge32(38_000))
                }
                _ => Err(VarbindError::NoSuchObject),
            }
        }
    }

    #[async_trait::async_trait]
    impl ProtocolSession for ScriptedSession {
        async fn get_many(&mut self, oids: &[&str]) -> Result<Vec<Varbind>, SessionError> {
            // The system group is identified by its sysDescr OID
            if self.system_times_out && oids.contains(&"1.3.6.1.2.1.1.1.0") {
                return Err(SessionError::Timeout(Duration::from_secs(2)));
            }
            Ok(oids
                .iter()
                .map(|oid| Varbind {
                    oid: oid.to_string(),
                    value: self.answer(oid),
                })
                .collect())
        }

        async fn walk(&mut self, base_oid: &str) -> Result<Vec<Varbind>, SessionError> {
            if base_oid == "1.3.6.1.2.1.25.2.3.1" {
                return Ok(vec![
                    Varbind {
                        oid: format!("{base_oid}.3.1"),
                        value: Ok(WireValue::OctetString(b"system disk".to_vec())),
                    },
                    Varbind {
                        oid: format!("{base_oid}.5.1"),
                        value: Ok(WireValue::Gauge32(1000)),
                    },
                    Varbind {
                        oid: format!("{base_oid}.6.1"),
                        value: Ok(WireValue::Gauge32(250)),
                    },
                ]);
            }
            Ok(Vec::new())
        }
    }

    fn test_device() -> Arc<DeviceConfig> {
        Arc::new(DeviceConfig::new("core-sw-1", "192.0.2.10"))
    }

    #[tokio::test]
    async fn test_pass_shares_one_session_across_groups() {
        let factory = MockFactory::new();
        let catalog = default_catalog();
        let device = test_device();
        let groups = catalog.groups_for_tier(Tier::Standard);
        assert_eq!(groups.len(), 2); // system + storage

        let mut session = factory.open(&device).await.unwrap();
        let result = collect_pass(session.as_mut(), &device, Tier::Standard, &groups).await;

        assert_eq!(factory.opens.load(Ordering::SeqCst), 1);
        assert_eq!(result.metrics.len(), 2);
        assert_eq!(result.summary.uptime_seconds, Some(123.45));
        assert_eq!(result.summary.disk_usage, Some(25.0));
        assert_eq!(result.summary.status, HealthStatus::Ok);
        assert!(result.summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_unanswered_oids_mark_pass_partial() {
        let mut factory = MockFactory::new();
        factory.no_sensors = true;
        let catalog = default_catalog();
        let device = test_device();
        let groups = catalog.groups_for_tier(Tier::Fast);

        let mut session = factory.open(&device).await.unwrap();
        let result = collect_pass(session.as_mut(), &device, Tier::Fast, &groups).await;

        // The answered metrics survive, the unanswered ones record causes
        assert_eq!(result.summary.cpu_usage, Some(42.0));
        assert_eq!(result.summary.temperature, None);
        assert_eq!(result.summary.status, HealthStatus::Partial);
        assert_eq!(result.summary.errors.len(), 2);
        assert!(
            result
                .summary
                .errors
                .iter()
                .all(|e| e.contains("no such object"))
        );
    }

    #[tokio::test]
    async fn test_group_timeout_absorbed_as_partial() {
        let mut factory = MockFactory::new();
        factory.system_times_out = true;
        let catalog = default_catalog();
        let device = test_device();
        let groups = catalog.groups_for_tier(Tier::Standard);

        let mut session = factory.open(&device).await.unwrap();
        let result = collect_pass(session.as_mut(), &device, Tier::Standard, &groups).await;

        // The failed group is present but empty; the storage group survives
        let GroupValues::Scalars(system) = &result.metrics["system"] else {
            panic!("expected scalar group");
        };
        assert!(system.is_empty());
        assert_eq!(result.summary.status, HealthStatus::Partial);
        assert_eq!(result.summary.errors.len(), 1);
        assert!(result.summary.errors[0].starts_with("system:"));
        assert_eq!(result.summary.disk_usage, Some(25.0));
    }

    #[tokio::test]
    async fn test_collector_fires_on_start_for_every_tier() {
        let factory = Arc::new(MockFactory::new());
        let (sink, mut rx) = ChannelSink::new();
        let mut collector = DeviceCollector::new(
            test_device(),
            Arc::new(default_catalog()),
            TierIntervals::default(),
            factory,
            Arc::new(sink),
        );

        collector.start();
        assert!(collector.is_running());
        assert_eq!(collector.armed_tiers().len(), 3);

        // One immediate pass per tier
        let mut seen = Vec::new();
        for _ in 0..3 {
            let outcome = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("first pass should fire immediately")
                .unwrap();
            seen.push(outcome.unwrap().tier);
        }
        seen.sort();
        assert_eq!(seen, vec![Tier::Fast, Tier::Standard, Tier::Slow]);

        collector.stop();
        assert!(!collector.is_running());
        // Idempotent
        collector.stop();
    }

    #[tokio::test]
    async fn test_open_failure_reported_and_loop_continues() {
        let mut factory = MockFactory::new();
        factory.refuse = true;
        let factory = Arc::new(factory);
        let (sink, mut rx) = ChannelSink::new();

        let intervals = TierIntervals {
            fast: Duration::from_secs(1),
            ..TierIntervals::default()
        };
        let mut collector = DeviceCollector::new(
            test_device(),
            Arc::new(default_catalog()),
            intervals,
            Arc::clone(&factory) as Arc<dyn SessionFactory>,
            Arc::new(sink),
        );
        collector.start();

        // First delivery per tier is an error outcome
        let outcome = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let err = outcome.unwrap_err();
        assert_eq!(err.device_id, "core-sw-1");
        assert!(matches!(err.source, SessionError::Open { .. }));

        // The fast tier keeps ticking at its unchanged interval
        let next_fast = async {
            loop {
                let outcome = rx.recv().await.unwrap();
                if let Err(e) = outcome
                    && e.tier == Tier::Fast
                {
                    break;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(3), next_fast)
            .await
            .expect("fast tier should tick again");

        collector.stop();
    }
}
