//! Temperatures from `sysinfo` components, for hosts without readable hwmon

use sysinfo::Components;

use super::{SensorReading, Snapshot, CELSIUS};

pub fn read_temperatures() -> Snapshot {
    let components = Components::new_with_refreshed_list();
    let mut snapshot = Snapshot::new();

    for component in components.iter() {
        let Some(temp) = component.temperature() else {
            continue;
        };
        if !temp.is_finite() {
            continue;
        }
        let (chip, label) = split_label(component.label());
        let reading = SensorReading::new(chip, label, f64::from(temp), CELSIUS);
        snapshot.insert(reading.key.clone(), reading);
    }

    snapshot
}

/// sysinfo joins chip and channel as "<chip> <label>"
fn split_label(label: &str) -> (&str, &str) {
    match label.split_once(' ') {
        Some((chip, rest)) if !rest.trim().is_empty() => (chip, rest.trim()),
        _ => (label, label),
    }
}
