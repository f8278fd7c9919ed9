//! Periodic sensor watch driver
//!
//! One tokio task runs the passes back to back. The store lock is held for a
//! whole pass, so control-plane updates interleave between passes, never
//! inside one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};

use super::entry::WatchStep;
use super::store::WatchStore;
use crate::actuators::ActionExecutor;
use crate::sensors::SensorSource;

pub type SharedStore = Arc<Mutex<WatchStore>>;

/// What one pass did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub evaluated: usize,
    /// Watched keys absent from the snapshot
    pub missing: usize,
    /// Keys whose actions were dispatched, with the triggering value
    pub fired: Vec<(String, f64)>,
    /// Fired keys whose reboot/shutdown was rejected
    pub failed_system_actions: usize,
}

pub struct WatchScheduler<S, E> {
    store: SharedStore,
    source: S,
    executor: E,
    threshold: u32,
    period: Duration,
}

impl<S: SensorSource, E: ActionExecutor> WatchScheduler<S, E> {
    pub fn new(store: SharedStore, source: S, executor: E, threshold: u32, period: Duration) -> Self {
        Self {
            store,
            source,
            executor,
            threshold: threshold.max(1),
            period,
        }
    }

    /// Evaluate every entry once against a fresh snapshot
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let mut store = self.store.lock().await;
        if store.is_empty() {
            return report;
        }

        let snapshot = self.source.snapshot();
        for entry in store.entries_mut() {
            let Some(reading) = snapshot.get(entry.key()) else {
                tracing::debug!("Watched sensor {} missing from snapshot", entry.key());
                report.missing += 1;
                continue;
            };
            report.evaluated += 1;

            match entry.observe(reading.value, self.threshold) {
                WatchStep::Fire => {
                    tracing::warn!(
                        "Sensor {} reading {}{} outside {}, firing {}",
                        entry.key(),
                        reading.value,
                        reading.unit,
                        entry.condition(),
                        entry.actions()
                    );
                    let result = self.executor.fire(entry, reading.value).await;
                    if !result.system_action_ok {
                        report.failed_system_actions += 1;
                    }
                    report.fired.push((entry.key().to_string(), reading.value));
                }
                WatchStep::Pending(failures) => {
                    tracing::debug!(
                        "Sensor {} alarming ({}/{})",
                        entry.key(),
                        failures,
                        self.threshold
                    );
                }
                WatchStep::Ok | WatchStep::Held => {}
            }
        }

        report
    }

    /// Run passes every `period` until the task is dropped.
    ///
    /// An overrunning pass delays the next one; missed ticks are skipped.
    pub async fn run(self) {
        tracing::info!(
            "Sensor watch running every {:?}, threshold {}",
            self.period,
            self.threshold
        );
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let report = self.tick().await;
            tracing::debug!(
                "Sensor watch pass: {} evaluated, {} missing, {} fired",
                report.evaluated,
                report.missing,
                report.fired.len()
            );
            if report.failed_system_actions > 0 {
                tracing::warn!(
                    "{} system actions were rejected this pass and will not be retried",
                    report.failed_system_actions
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuators::FireResult;
    use crate::sensors::{SensorReading, Snapshot, CELSIUS};
    use crate::watch::{ActionSet, Condition, WatchEntry, WatchState};
    use std::sync::Mutex as StdMutex;

    /// Replays queued snapshots, counting fetches
    #[derive(Default)]
    struct ScriptedSensors {
        snapshots: StdMutex<Vec<Snapshot>>,
        fetches: StdMutex<usize>,
    }

    impl ScriptedSensors {
        fn push(&self, readings: &[(&str, f64)]) {
            let mut snapshot = Snapshot::new();
            for &(key, value) in readings {
                let (chip, label) = key.split_once('.').unwrap_or((key, key));
                let reading = SensorReading {
                    key: key.to_string(),
                    ..SensorReading::new(chip, label, value, CELSIUS)
                };
                snapshot.insert(reading.key.clone(), reading);
            }
            self.snapshots.lock().unwrap().insert(0, snapshot);
        }
    }

    impl SensorSource for ScriptedSensors {
        fn snapshot(&self) -> Snapshot {
            *self.fetches.lock().unwrap() += 1;
            self.snapshots.lock().unwrap().pop().unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        fired: StdMutex<Vec<(String, f64)>>,
        system_ok: bool,
    }

    impl ActionExecutor for RecordingExecutor {
        async fn fire(&self, entry: &WatchEntry, value: f64) -> FireResult {
            self.fired
                .lock()
                .unwrap()
                .push((entry.key().to_string(), value));
            FireResult {
                system_action_ok: self.system_ok || !entry.actions().has_system_action(),
            }
        }
    }

    fn shared(dir: &tempfile::TempDir, entries: Vec<WatchEntry>) -> SharedStore {
        let mut store = WatchStore::load(dir.path().join("sensor_actions_config"));
        for entry in entries {
            store.update(entry).unwrap();
        }
        Arc::new(Mutex::new(store))
    }

    fn scheduler(
        store: SharedStore,
        threshold: u32,
    ) -> WatchScheduler<ScriptedSensors, RecordingExecutor> {
        WatchScheduler::new(
            store,
            ScriptedSensors::default(),
            RecordingExecutor::default(),
            threshold,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_empty_store_skips_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let sched = scheduler(shared(&dir, Vec::new()), 1);
        let report = sched.tick().await;
        assert_eq!(report, TickReport::default());
        assert_eq!(*sched.source.fetches.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_debounce_and_recovery() {
        // cpu_temp = 1,1,80: notify, acceptable while below 80
        let entry = WatchEntry::parse("cpu_temp", "1,1,80").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = shared(&dir, vec![entry]);
        let sched = scheduler(store.clone(), 2);
        for value in [85.0, 90.0, 70.0] {
            sched.source.push(&[("cpu_temp", value)]);
        }

        let first = sched.tick().await;
        assert!(first.fired.is_empty());
        assert_eq!(store.lock().await.get("cpu_temp").unwrap().consecutive_failures(), 1);

        let second = sched.tick().await;
        assert_eq!(second.fired, vec![("cpu_temp".to_string(), 90.0)]);
        assert_eq!(
            store.lock().await.get("cpu_temp").unwrap().state(),
            WatchState::Triggered
        );

        let third = sched.tick().await;
        assert!(third.fired.is_empty());
        let guard = store.lock().await;
        let entry = guard.get("cpu_temp").unwrap();
        assert_eq!(entry.state(), WatchState::Normal);
        assert_eq!(entry.consecutive_failures(), 0);

        assert_eq!(
            *sched.executor.fired.lock().unwrap(),
            vec![("cpu_temp".to_string(), 90.0)]
        );
    }

    #[tokio::test]
    async fn test_sustained_alarm_fires_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = shared(&dir, vec![WatchEntry::new(
            "nct6798.fan2",
            ActionSet::REBOOT,
            Condition::MoreThan(300.0),
        )]);
        let sched = scheduler(store, 3);
        for _ in 0..10 {
            sched.source.push(&[("nct6798.fan2", 0.0)]);
        }

        let mut fired = 0;
        let mut failed = 0;
        for _ in 0..10 {
            let report = sched.tick().await;
            fired += report.fired.len();
            failed += report.failed_system_actions;
        }
        assert_eq!(fired, 1);
        // failed reboot is reported, not retried
        assert_eq!(failed, 1);
        assert_eq!(sched.executor.fired.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_sensor_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = shared(&dir, vec![
            WatchEntry::new("gpu.temp", ActionSet::NOTIFY, Condition::LessThan(80.0)),
            WatchEntry::new("cpu.temp", ActionSet::NOTIFY, Condition::LessThan(80.0)),
        ]);
        let sched = scheduler(store.clone(), 2);
        sched.source.push(&[("gpu.temp", 95.0), ("cpu.temp", 95.0)]);
        sched.source.push(&[("cpu.temp", 95.0)]);
        sched.source.push(&[("gpu.temp", 95.0)]);

        sched.tick().await;
        let report = sched.tick().await;
        assert_eq!(report.missing, 1);
        assert_eq!(report.fired, vec![("cpu.temp".to_string(), 95.0)]);
        assert_eq!(store.lock().await.get("gpu.temp").unwrap().consecutive_failures(), 1);

        let report = sched.tick().await;
        assert_eq!(report.fired, vec![("gpu.temp".to_string(), 95.0)]);
    }

    #[tokio::test]
    async fn test_stalled_notification_releases_store() {
        use crate::actuators::telegram::tests::stalled_notifier;
        use crate::actuators::HostActions;
        use crate::config::Config;

        let dir = tempfile::tempdir().unwrap();
        let store = shared(&dir, vec![WatchEntry::new(
            "cpu_temp",
            ActionSet::NOTIFY,
            Condition::LessThan(80.0),
        )]);
        let sensors = ScriptedSensors::default();
        for _ in 0..50 {
            sensors.push(&[("cpu_temp", 95.0)]);
        }
        let executor = HostActions::new(stalled_notifier().await, &Config::default());
        let sched = WatchScheduler::new(store.clone(), sensors, executor, 1, Duration::from_millis(50));
        let task = tokio::spawn(sched.run());

        // let the first pass take the lock and start notifying
        tokio::time::sleep(Duration::from_millis(100)).await;
        let guard = tokio::time::timeout(Duration::from_secs(5), store.lock()).await;
        assert!(guard.is_ok(), "store still locked by a stalled notification");
        assert_eq!(
            guard.unwrap().get("cpu_temp").unwrap().state(),
            WatchState::Triggered
        );
        task.abort();
    }
}
