//! Sensors module - point-in-time hardware readings (temperatures, fans)

pub mod components;
pub mod hwmon;
pub mod readings;

use std::collections::BTreeMap;
use std::path::PathBuf;

/// One sensor value from a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// `<chip>.<label>`, stable across snapshots
    pub key: String,
    pub chip: String,
    pub label: String,
    pub value: f64,
    pub unit: &'static str,
}

impl SensorReading {
    pub fn new(chip: &str, label: &str, value: f64, unit: &'static str) -> Self {
        Self {
            key: format!("{}.{}", chip, label),
            chip: chip.to_string(),
            label: label.to_string(),
            value,
            unit,
        }
    }
}

/// Readings keyed by [`SensorReading::key`]
pub type Snapshot = BTreeMap<String, SensorReading>;

pub const CELSIUS: &str = "°C";
pub const RPM: &str = "RPM";

/// Source of sensor snapshots.
///
/// Implementations never fail: readings that cannot be acquired are simply
/// left out of the snapshot.
pub trait SensorSource: Send + Sync {
    fn snapshot(&self) -> Snapshot;
}

/// Host sensors: hwmon on Linux, `sysinfo` components as temperature fallback
#[derive(Debug, Clone)]
pub struct SystemSensors {
    hwmon_root: PathBuf,
}

impl Default for SystemSensors {
    fn default() -> Self {
        Self {
            hwmon_root: PathBuf::from(hwmon::HWMON_ROOT),
        }
    }
}

impl SensorSource for SystemSensors {
    fn snapshot(&self) -> Snapshot {
        let mut snapshot = hwmon::read_fans(&self.hwmon_root);
        let temps = hwmon::read_temperatures(&self.hwmon_root);

        if temps.is_empty() {
            tracing::debug!("No hwmon temperatures under {:?}, using sysinfo components", self.hwmon_root);
            snapshot.extend(components::read_temperatures());
        } else {
            snapshot.extend(temps);
        }

        snapshot
    }
}
