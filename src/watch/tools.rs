//! Watch list management tools

use rmcp::{model::*, ErrorData as McpError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::entry::validate_key;
use super::{ActionSet, Condition, SharedStore, WatchEntry, WatchState};
use crate::shared::{internal_error, invalid_params};

// === Parameter Types ===

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SetWatchParams {
    #[schemars(description = "Sensor key as shown by get_sensor_readings, e.g. 'coretemp.Package id 0'")]
    pub key: String,
    #[schemars(description = "Acceptable region: 'more' (reading must stay above value), 'less' (must stay below value) or 'range' (must stay strictly inside min:max)")]
    pub condition: String,
    #[schemars(description = "Threshold number, or 'min:max' for range conditions")]
    pub value: String,
    #[schemars(description = "Send a Telegram notification when the alarm fires (default true)")]
    #[serde(default = "default_true")]
    pub notify: bool,
    #[schemars(description = "Reboot the host with the configured delay when the alarm fires")]
    #[serde(default)]
    pub reboot: bool,
    #[schemars(description = "Shut the host down with the configured delay when the alarm fires")]
    #[serde(default)]
    pub shutdown: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RemoveWatchParams {
    #[schemars(description = "Sensor key of the watch entry to delete")]
    pub key: String,
}

// === Tool Functions ===

pub async fn list_watches(store: &SharedStore, threshold: u32) -> Result<CallToolResult, McpError> {
    let store = store.lock().await;

    if store.is_empty() {
        return Ok(CallToolResult::success(vec![Content::text(format!(
            "No sensor watch entries configured ({})",
            store.path().display()
        ))]));
    }

    let mut output = format!(
        "{} sensor watch entries (fire after {} consecutive alarming readings):\n\n",
        store.len(),
        threshold
    );
    for entry in store.entries() {
        output.push_str(&format_entry(entry));
    }
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

pub async fn set_watch(store: &SharedStore, params: SetWatchParams) -> Result<CallToolResult, McpError> {
    let key = validate_key(params.key.trim()).map_err(|e| invalid_params(e.to_string()))?;
    let condition = Condition::from_kind(&params.condition, &params.value)
        .map_err(|e| invalid_params(e.to_string()))?;
    let actions = ActionSet::from_flags(params.notify, params.reboot, params.shutdown);

    let entry = WatchEntry::new(key, actions, condition);
    let summary = format_entry(&entry);

    let mut store = store.lock().await;
    let replaced = store.get(key).is_some();
    store
        .update(entry)
        .map_err(|e| internal_error(format!("Entry applied in memory but not saved: {}", e)))?;

    let verb = if replaced { "Updated" } else { "Added" };
    Ok(CallToolResult::success(vec![Content::text(format!(
        "{} sensor watch entry:\n\n{}",
        verb, summary
    ))]))
}

pub async fn remove_watch(store: &SharedStore, params: RemoveWatchParams) -> Result<CallToolResult, McpError> {
    let mut store = store.lock().await;
    match store.remove(params.key.trim()) {
        Ok(Some(_)) => Ok(CallToolResult::success(vec![Content::text(format!(
            "Removed sensor watch entry '{}'",
            params.key.trim()
        ))])),
        Ok(None) => Ok(CallToolResult::success(vec![Content::text(format!(
            "No sensor watch entry named '{}'",
            params.key.trim()
        ))])),
        Err(e) => Err(internal_error(format!(
            "Entry removed in memory but not saved: {}",
            e
        ))),
    }
}

// === Formatting ===

fn format_entry(entry: &WatchEntry) -> String {
    let state = match entry.state() {
        WatchState::Normal => "normal".to_string(),
        WatchState::Accumulating => format!("alarming ({} in a row)", entry.consecutive_failures()),
        WatchState::Triggered => "triggered".to_string(),
    };

    let mut output = format!(
        "{}\n  acceptable: {}\n  actions: {}\n  state: {}\n",
        entry.key(),
        entry.condition(),
        entry.actions(),
        state
    );
    if let Some(fired) = entry.last_fired() {
        output.push_str(&format!("  last fired: {}\n", fired.format("%Y-%m-%d %H:%M:%S")));
    }
    output.push('\n');
    output
}
