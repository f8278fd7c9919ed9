//! Watch entries and their debounce state machine
//!
//! ```text
//!            fail (n < threshold)            fail (n >= threshold) / fire
//!  Normal ─────────────────────► Accumulating ─────────────────────► Triggered
//!    ▲                               │                                  │
//!    └────────── ok ─────────────────┴──────────────── ok ──────────────┘
//! ```
//!
//! A trigger fires exactly once per alarm episode. Only an acceptable reading
//! re-arms the entry.

use chrono::{DateTime, Local};

use super::action::ActionSet;
use super::condition::Condition;
use super::error::WatchError;

/// Debounce state derived from the runtime counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Normal,
    Accumulating,
    Triggered,
}

/// Outcome of feeding one reading to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStep {
    /// Reading acceptable, entry (re-)armed
    Ok,
    /// Reading in the alarm region, below the debounce threshold
    Pending(u32),
    /// Threshold reached: the caller must dispatch the actions now
    Fire,
    /// Still alarming after a fire, suppressed
    Held,
}

#[derive(Debug, Clone)]
pub struct WatchEntry {
    key: String,
    actions: ActionSet,
    condition: Condition,
    consecutive_failures: u32,
    triggered: bool,
    last_fired: Option<DateTime<Local>>,
}

impl WatchEntry {
    pub fn new(key: impl Into<String>, actions: ActionSet, condition: Condition) -> Self {
        Self {
            key: key.into(),
            actions,
            condition,
            consecutive_failures: 0,
            triggered: false,
            last_fired: None,
        }
    }

    /// Parse a persisted `action, condition, value` field list for `key`
    pub fn parse(key: &str, raw: &str) -> Result<Self, WatchError> {
        let key = validate_key(key.trim())?;

        let compact: String = raw.split_whitespace().collect();
        let fields: Vec<&str> = compact.split(',').collect();
        if fields.len() != 3 {
            return Err(WatchError::FieldCount(fields.len()));
        }

        let actions = ActionSet::parse(fields[0])?;
        let condition = Condition::from_parts(fields[1], fields[2])?;
        Ok(Self::new(key, actions, condition))
    }

    /// Persisted field list, the inverse of [`WatchEntry::parse`]
    pub fn persisted_value(&self) -> String {
        format!(
            "{}, {}, {}",
            self.actions.bits(),
            self.condition.code(),
            self.condition.value_string()
        )
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn actions(&self) -> ActionSet {
        self.actions
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn last_fired(&self) -> Option<DateTime<Local>> {
        self.last_fired
    }

    pub fn state(&self) -> WatchState {
        if self.triggered {
            WatchState::Triggered
        } else if self.consecutive_failures > 0 {
            WatchState::Accumulating
        } else {
            WatchState::Normal
        }
    }

    /// Advance the state machine with a fresh reading.
    ///
    /// `threshold` is the number of consecutive alarming readings needed to
    /// fire; values below 1 are treated as 1. On [`WatchStep::Fire`] the entry
    /// is already locked, so the caller dispatches the actions exactly once.
    pub fn observe(&mut self, value: f64, threshold: u32) -> WatchStep {
        if self.condition.is_satisfied_by(value) {
            self.consecutive_failures = 0;
            self.triggered = false;
            return WatchStep::Ok;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.triggered {
            return WatchStep::Held;
        }
        if self.consecutive_failures >= threshold.max(1) {
            self.triggered = true;
            self.last_fired = Some(Local::now());
            return WatchStep::Fire;
        }
        WatchStep::Pending(self.consecutive_failures)
    }

    /// Same persisted fields, ignoring runtime state
    pub fn same_config(&self, other: &WatchEntry) -> bool {
        self.key == other.key && self.actions == other.actions && self.condition == other.condition
    }
}

/// Check that `key` survives a write/read cycle of the watch file unchanged
pub fn validate_key(key: &str) -> Result<&str, WatchError> {
    if key.is_empty() {
        return Err(WatchError::EmptyKey);
    }
    let bad_start = key.starts_with(['#', ';', '[']);
    let bad_char = key.chars().any(|c| c == '=' || c.is_control());
    if bad_start || bad_char || key.trim() != key {
        return Err(WatchError::InvalidKey(key.to_string()));
    }
    Ok(key)
}
