//! Linux hwmon readings (`/sys/class/hwmon`)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{SensorReading, Snapshot, CELSIUS, RPM};

pub const HWMON_ROOT: &str = "/sys/class/hwmon";

/// All `temp*_input` channels, converted from millidegrees to °C
pub fn read_temperatures(root: &Path) -> Snapshot {
    read_channels(root, "temp", CELSIUS, 1000.0)
}

/// All `fan*_input` channels in RPM
pub fn read_fans(root: &Path) -> Snapshot {
    read_channels(root, "fan", RPM, 1.0)
}

fn read_channels(root: &Path, prefix: &str, unit: &'static str, divisor: f64) -> Snapshot {
    let mut snapshot = Snapshot::new();
    // unlabeled channels are numbered per chip name across devices
    let mut counters: HashMap<String, usize> = HashMap::new();

    for device in hwmon_devices(root) {
        let Some(chip) = read_trimmed(&device.join("name")) else {
            continue;
        };

        for index in channel_indices(&device, prefix) {
            let Some(raw) = read_trimmed(&device.join(format!("{}{}_input", prefix, index))) else {
                continue;
            };
            let Ok(raw) = raw.parse::<i64>() else {
                tracing::debug!("Unparsable {}{}_input on {}: {:?}", prefix, index, chip, raw);
                continue;
            };

            let counter = counters.entry(chip.clone()).or_insert(0);
            let label = read_trimmed(&device.join(format!("{}{}_label", prefix, index)))
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| format!("{}_{}", chip, counter));
            *counter += 1;

            let reading = SensorReading::new(&chip, &label, raw as f64 / divisor, unit);
            snapshot.insert(reading.key.clone(), reading);
        }
    }

    snapshot
}

fn hwmon_devices(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut devices: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    devices.sort();
    devices
}

/// Channel numbers N for which `<prefix>N_input` exists, ascending
fn channel_indices(device: &Path, prefix: &str) -> Vec<u32> {
    let Ok(entries) = fs::read_dir(device) else {
        return Vec::new();
    };
    let mut indices: Vec<u32> = entries
        .flatten()
        .filter_map(|e| {
            let name = e.file_name();
            let name = name.to_str()?;
            name.strip_prefix(prefix)?
                .strip_suffix("_input")?
                .parse()
                .ok()
        })
        .collect();
    indices.sort_unstable();
    indices
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}
