//! Periodic background backup.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SnapshotService;

/// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to the running auto-backup task. Backs up immediately, then once
/// per interval, until [`AutoBackup::shutdown`] is called.
pub struct AutoBackup {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AutoBackup {
    pub fn spawn(service: SnapshotService, interval: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        if interval < MIN_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "Auto backup interval too short; using {}s",
                MIN_INTERVAL.as_secs()
            );
        }
        let interval = interval.max(MIN_INTERVAL);

        let task = tokio::spawn(async move {
            tracing::info!(
                interval_secs = interval.as_secs(),
                "Auto backup started"
            );
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => service.backup_and_log().await,
                    _ = stopped.changed() => break,
                }
            }
            tracing::info!("Auto backup stopped");
        });

        Self { stop, task }
    }

    /// Stop the task and wait for an in-flight backup to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Auto backup task ended abnormally: {}", e);
        }
    }
}
