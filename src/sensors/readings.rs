//! Human-readable sensor listing

use rmcp::{model::*, ErrorData as McpError};

use super::{SensorSource, Snapshot, CELSIUS, RPM};

// === Tool Functions ===

pub async fn get_sensor_readings(source: &impl SensorSource) -> Result<CallToolResult, McpError> {
    let snapshot = source.snapshot();
    Ok(CallToolResult::success(vec![Content::text(format_snapshot(
        &snapshot,
    ))]))
}

// === Formatting ===

pub fn format_snapshot(snapshot: &Snapshot) -> String {
    let mut output = String::new();
    output.push_str(&format_section(snapshot, "Temperatures", CELSIUS, "temperature"));
    output.push('\n');
    output.push_str(&format_section(snapshot, "Fan speeds", RPM, "fan"));
    output
}

fn format_section(snapshot: &Snapshot, title: &str, unit: &str, what: &str) -> String {
    let readings: Vec<_> = snapshot.values().filter(|r| r.unit == unit).collect();
    if readings.is_empty() {
        return format!("Can't read any {} info\n", what);
    }

    let mut output = format!("{}:\n", title);
    let mut last_chip: Option<&str> = None;
    for reading in readings {
        if last_chip != Some(reading.chip.as_str()) {
            last_chip = Some(reading.chip.as_str());
            output.push_str(&format!("\n  {}\n", reading.chip));
        }
        output.push_str(&format!(
            "    {:<32} {}{}    [{}]\n",
            reading.label, reading.value, reading.unit, reading.key
        ));
    }
    output
}
