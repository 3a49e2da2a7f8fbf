//! Built-in metric groups.
//!
//! OIDs cover standard MIB-II system identity, UCD-SNMP CPU/memory, the
//! Host Resources storage table, the interfaces table, and LM-Sensors
//! temperature readings.

use super::types::{
    Catalog, ColumnDefinition, GroupSpec, MetricDefinition, MetricGroup, MetricKind, RowCalc,
    RowFilter, TableDefinition, Tier, Transform,
};

/// System identity scalars (MIB-II `system` subtree).
pub const SYSTEM_METRICS: &[MetricDefinition] = &[
    MetricDefinition {
        name: "sysDescr",
        oid: "1.3.6.1.2.1.1.1.0",
        kind: MetricKind::String,
        transform: Some(Transform::Trim),
        help: "Device description string",
    },
    MetricDefinition {
        name: "sysUpTime",
        oid: "1.3.6.1.2.1.1.3.0",
        kind: MetricKind::Gauge,
        transform: Some(Transform::TicksToSeconds),
        help: "Uptime since management subsystem restart, in seconds",
    },
    MetricDefinition {
        name: "sysContact",
        oid: "1.3.6.1.2.1.1.4.0",
        kind: MetricKind::String,
        transform: Some(Transform::Trim),
        help: "Administrative contact",
    },
    MetricDefinition {
        name: "sysName",
        oid: "1.3.6.1.2.1.1.5.0",
        kind: MetricKind::String,
        transform: Some(Transform::Trim),
        help: "Administratively assigned node name",
    },
    MetricDefinition {
        name: "sysLocation",
        oid: "1.3.6.1.2.1.1.6.0",
        kind: MetricKind::String,
        transform: Some(Transform::Trim),
        help: "Physical location",
    },
];

/// CPU and memory scalars (UCD-SNMP).
pub const RESOURCE_METRICS: &[MetricDefinition] = &[
    MetricDefinition {
        name: "cpuUsage",
        oid: "1.3.6.1.4.1.2021.11.9.0",
        kind: MetricKind::Gauge,
        transform: None,
        help: "CPU time spent in user mode, percent",
    },
    MetricDefinition {
        name: "memTotalKb",
        oid: "1.3.6.1.4.1.2021.4.5.0",
        kind: MetricKind::Gauge,
        transform: None,
        help: "Total real memory, kilobytes",
    },
    MetricDefinition {
        name: "memAvailKb",
        oid: "1.3.6.1.4.1.2021.4.6.0",
        kind: MetricKind::Gauge,
        transform: None,
        help: "Available real memory, kilobytes",
    },
];

/// Temperature scalars (LM-Sensors extension, reported in milli-degrees).
pub const TEMPERATURE_METRICS: &[MetricDefinition] = &[
    MetricDefinition {
        name: "boardTemperature",
        oid: "1.3.6.1.4.1.2021.13.16.2.1.3.1",
        kind: MetricKind::Gauge,
        transform: Some(Transform::Scale(0.001)),
        help: "Mainboard temperature, degrees Celsius",
    },
    MetricDefinition {
        name: "cpuTemperature",
        oid: "1.3.6.1.4.1.2021.13.16.2.1.3.2",
        kind: MetricKind::Gauge,
        transform: Some(Transform::Scale(0.001)),
        help: "CPU temperature, degrees Celsius",
    },
];

/// Host Resources storage table (`hrStorageEntry`).
///
/// The description filter keeps memory/ram rows alongside disk-like rows:
/// the summary derives both memory and disk usage from this one table.
pub const STORAGE_TABLE: TableDefinition = TableDefinition {
    name: "hrStorageTable",
    base_oid: "1.3.6.1.2.1.25.2.3.1",
    columns: &[
        ColumnDefinition {
            name: "storageDescr",
            column: 3,
            kind: MetricKind::String,
            transform: Some(Transform::Trim),
        },
        ColumnDefinition {
            name: "storageAllocationUnits",
            column: 4,
            kind: MetricKind::Gauge,
            transform: None,
        },
        ColumnDefinition {
            name: "storageSize",
            column: 5,
            kind: MetricKind::Gauge,
            transform: None,
        },
        ColumnDefinition {
            name: "storageUsed",
            column: 6,
            kind: MetricKind::Gauge,
            transform: None,
        },
    ],
    calc: Some(RowCalc::UsagePercent {
        used: "storageUsed",
        total: "storageSize",
        output: "storageUsagePercent",
    }),
    filter: Some(RowFilter::DescrContainsAny {
        field: "storageDescr",
        needles: &["memory", "ram", "disk", "flash", "storage", "drive"],
    }),
};

/// Interfaces table (`ifEntry`), restricted to operationally-up rows.
pub const INTERFACE_TABLE: TableDefinition = TableDefinition {
    name: "ifTable",
    base_oid: "1.3.6.1.2.1.2.2.1",
    columns: &[
        ColumnDefinition {
            name: "ifDescr",
            column: 2,
            kind: MetricKind::String,
            transform: Some(Transform::Trim),
        },
        ColumnDefinition {
            name: "ifType",
            column: 3,
            kind: MetricKind::Gauge,
            transform: None,
        },
        ColumnDefinition {
            name: "ifSpeed",
            column: 5,
            kind: MetricKind::Gauge,
            transform: None,
        },
        ColumnDefinition {
            name: "ifOperStatus",
            column: 8,
            kind: MetricKind::Gauge,
            transform: None,
        },
        ColumnDefinition {
            name: "ifInOctets",
            column: 10,
            kind: MetricKind::Counter,
            transform: None,
        },
        ColumnDefinition {
            name: "ifOutOctets",
            column: 16,
            kind: MetricKind::Counter,
            transform: None,
        },
    ],
    calc: None,
    filter: Some(RowFilter::FieldEqualsInt {
        field: "ifOperStatus",
        value: 1,
    }),
};

/// The built-in catalog: five groups across three tiers.
pub fn default_catalog() -> Catalog {
    Catalog::new(vec![
        MetricGroup {
            name: "system",
            tier: Tier::Standard,
            spec: GroupSpec::Scalars(SYSTEM_METRICS),
        },
        MetricGroup {
            name: "resources",
            tier: Tier::Fast,
            spec: GroupSpec::Scalars(RESOURCE_METRICS),
        },
        MetricGroup {
            name: "temperature",
            tier: Tier::Fast,
            spec: GroupSpec::Scalars(TEMPERATURE_METRICS),
        },
        MetricGroup {
            name: "storage",
            tier: Tier::Standard,
            spec: GroupSpec::Table(STORAGE_TABLE),
        },
        MetricGroup {
            name: "interfaces",
            tier: Tier::Slow,
            spec: GroupSpec::Table(INTERFACE_TABLE),
        },
    ])
}
