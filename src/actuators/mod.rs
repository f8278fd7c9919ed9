//! Actuators module - what happens when a watch entry fires
//!
//! An alarm may notify the configured recipients and/or schedule a reboot or
//! shutdown. Privileged actions are attempted once per alarm and never
//! retried; their outcome is appended to the notification.

pub mod power;
pub mod telegram;

use std::future::Future;

use crate::config::Config;
use crate::shared::html_escape;
use crate::watch::{ActionSet, WatchEntry};

use self::power::SystemAction;
use self::telegram::{Notifier, TelegramNotifier};

/// Result of dispatching one alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireResult {
    /// False only when a requested reboot/shutdown was rejected
    pub system_action_ok: bool,
}

/// Performs the actions configured on a fired entry
pub trait ActionExecutor: Send + Sync {
    fn fire(&self, entry: &WatchEntry, value: f64) -> impl Future<Output = FireResult> + Send;
}

/// Production executor: `shutdown(8)` plus Telegram notifications
#[derive(Debug, Clone)]
pub struct HostActions<N = TelegramNotifier> {
    notifier: N,
    reboot_delay_minutes: u32,
    shutdown_delay_minutes: u32,
}

impl HostActions<TelegramNotifier> {
    pub fn from_config(config: &Config, http_client: reqwest::Client) -> Self {
        Self::new(TelegramNotifier::from_config(config, http_client), config)
    }
}

impl<N: Notifier> HostActions<N> {
    pub fn new(notifier: N, config: &Config) -> Self {
        Self {
            notifier,
            reboot_delay_minutes: config.reboot_delay_minutes,
            shutdown_delay_minutes: config.shutdown_delay_minutes,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Reboot wins when both reboot and shutdown are requested
    pub fn system_action_for(&self, actions: ActionSet) -> Option<(SystemAction, u32)> {
        if actions.contains(ActionSet::REBOOT) {
            Some((SystemAction::Reboot, self.reboot_delay_minutes))
        } else if actions.contains(ActionSet::SHUTDOWN) {
            Some((SystemAction::Shutdown, self.shutdown_delay_minutes))
        } else {
            None
        }
    }
}

impl<N: Notifier> ActionExecutor for HostActions<N> {
    async fn fire(&self, entry: &WatchEntry, value: f64) -> FireResult {
        let mut outcome = None;
        if let Some((action, delay)) = self.system_action_for(entry.actions()) {
            let ok = power::execute_system_action(action, delay);
            outcome = Some((action, ok));
        }

        if entry.actions().contains(ActionSet::NOTIFY) {
            self.notifier
                .notify_recipients(&alarm_message(entry, value, outcome))
                .await;
        }

        FireResult {
            system_action_ok: outcome.map_or(true, |(_, ok)| ok),
        }
    }
}

/// HTML message describing a fired entry
pub fn alarm_message(entry: &WatchEntry, value: f64, outcome: Option<(SystemAction, bool)>) -> String {
    let mut msg = format!(
        "Sensor Watcher Warning: sensor <b>\"{}\"</b> with reading <b>{}</b> is outside configured: {} <b>{}</b>",
        html_escape(entry.key()),
        value,
        entry.condition().phrase(),
        entry.condition().value_string()
    );

    match outcome {
        Some((action, true)) => {
            msg.push_str(&format!("\nThe system is going to {}", action.verb()));
        }
        Some((_, false)) => {
            msg.push_str("\nFailed to execute system action command, please check user permissions");
        }
        None => {}
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::Condition;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        async fn notify_recipients(&self, message: &str) {
            self.sent.lock().unwrap().push(message.to_string());
        }
    }

    fn executor() -> HostActions<RecordingNotifier> {
        let config = Config {
            reboot_delay_minutes: 2,
            shutdown_delay_minutes: 5,
            ..Config::default()
        };
        HostActions::new(RecordingNotifier::default(), &config)
    }

    #[test]
    fn test_message_mentions_key_value_and_condition() {
        let entry = WatchEntry::new("coretemp.Core 0", ActionSet::NOTIFY, Condition::LessThan(80.0));
        let msg = alarm_message(&entry, 92.5, None);
        assert!(msg.contains("\"coretemp.Core 0\""));
        assert!(msg.contains("<b>92.5</b>"));
        assert!(msg.contains("less than <b>80</b>"));
        assert!(!msg.contains('\n'));
    }

    #[test]
    fn test_message_reports_system_action_outcome() {
        let entry = WatchEntry::new(
            "fan",
            ActionSet::NOTIFY | ActionSet::SHUTDOWN,
            Condition::exclusive_range(300.0, 3000.0).unwrap(),
        );
        let ok = alarm_message(&entry, 0.0, Some((SystemAction::Shutdown, true)));
        assert!(ok.contains("in range <b>300:3000</b>"));
        assert!(ok.ends_with("The system is going to shutdown"));

        let failed = alarm_message(&entry, 0.0, Some((SystemAction::Shutdown, false)));
        assert!(failed.contains("check user permissions"));
    }

    #[test]
    fn test_reboot_wins_and_uses_its_own_delay() {
        let exec = executor();
        assert_eq!(
            exec.system_action_for(ActionSet::REBOOT | ActionSet::SHUTDOWN),
            Some((SystemAction::Reboot, 2))
        );
        assert_eq!(
            exec.system_action_for(ActionSet::SHUTDOWN),
            Some((SystemAction::Shutdown, 5))
        );
        assert_eq!(exec.system_action_for(ActionSet::NOTIFY), None);
    }

    #[tokio::test]
    async fn test_notify_only_fire() {
        let exec = executor();
        let entry = WatchEntry::new("cpu", ActionSet::NOTIFY, Condition::LessThan(80.0));

        let result = exec.fire(&entry, 85.0).await;
        assert!(result.system_action_ok);
        let sent = exec.notifier().sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("<b>85</b>"));
    }

    #[tokio::test]
    async fn test_empty_action_set_is_inert() {
        let exec = executor();
        let entry = WatchEntry::new("cpu", ActionSet::NONE, Condition::LessThan(80.0));

        let result = exec.fire(&entry, 85.0).await;
        assert!(result.system_action_ok);
        assert!(exec.notifier().sent.lock().unwrap().is_empty());
    }
}
