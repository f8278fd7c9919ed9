//! Combinable alarm actions

use std::fmt;
use std::ops::BitOr;

use super::error::WatchError;

/// Set of actions fired by a watch entry.
///
/// Stored on disk as a bitmask: Notify = 1, Reboot = 2, Shutdown = 4.
/// The empty set is valid and does nothing when fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const NONE: ActionSet = ActionSet(0);
    pub const NOTIFY: ActionSet = ActionSet(1);
    pub const REBOOT: ActionSet = ActionSet(2);
    pub const SHUTDOWN: ActionSet = ActionSet(4);

    const ALL_BITS: u8 = 1 | 2 | 4;

    /// Build from the on-disk bitmask, rejecting unknown bits
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL_BITS == 0 {
            Some(ActionSet(bits))
        } else {
            None
        }
    }

    /// Parse the on-disk integer field
    pub fn parse(field: &str) -> Result<Self, WatchError> {
        field
            .parse::<u8>()
            .ok()
            .and_then(Self::from_bits)
            .ok_or_else(|| WatchError::InvalidAction(field.to_string()))
    }

    pub fn from_flags(notify: bool, reboot: bool, shutdown: bool) -> Self {
        let mut set = Self::NONE;
        if notify {
            set = set | Self::NOTIFY;
        }
        if reboot {
            set = set | Self::REBOOT;
        }
        if shutdown {
            set = set | Self::SHUTDOWN;
        }
        set
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: ActionSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether a reboot or shutdown is requested
    pub fn has_system_action(self) -> bool {
        self.contains(Self::REBOOT) || self.contains(Self::SHUTDOWN)
    }
}

impl BitOr for ActionSet {
    type Output = ActionSet;

    fn bitor(self, rhs: ActionSet) -> ActionSet {
        ActionSet(self.0 | rhs.0)
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = [
            (Self::NOTIFY, "notify"),
            (Self::REBOOT, "reboot"),
            (Self::SHUTDOWN, "shutdown"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect();
        f.write_str(&names.join("+"))
    }
}
