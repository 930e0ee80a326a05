//! Fixed-interval scheduler for the alert scan.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::scan_job::{AlertScanJob, ScanJobError, ScanStats};

/// Runs an [`AlertScanJob`] on a fixed interval.
///
/// A run gate guarantees at most one cycle in flight: a tick (or a manual
/// [`ScanScheduler::trigger`]) that arrives while a cycle is running is
/// skipped with a warning rather than queued. [`ScanScheduler::shutdown`]
/// stops the loop without waiting for the next tick, after draining any
/// in-flight cycle.
pub struct ScanScheduler {
    job: Arc<AlertScanJob>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Notify,
    run_gate: Arc<Mutex<()>>,
}

impl ScanScheduler {
    /// Create a scheduler over a job and interval.
    #[must_use]
    pub fn new(job: Arc<AlertScanJob>, interval: Duration) -> Self {
        Self {
            job,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Notify::new(),
            run_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Drive the scan loop until shutdown. The first tick fires after one
    /// full interval.
    pub async fn run(&self) {
        info!(interval_secs = self.interval.as_secs(), "scan scheduler started");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // interval() fires immediately; consume that tick so the first
        // scan waits a full period
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    if self.try_run_cycle().await.is_none() {
                        warn!("previous scan still running, skipping this tick");
                    }
                }
                _ = self.shutdown_notify.notified() => {
                    break;
                }
            }
        }

        // drain: wait for an in-flight cycle before reporting stopped
        let _guard = self.run_gate.lock().await;
        info!("scan scheduler stopped");
    }

    /// Request the loop to stop without waiting for the next tick.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.shutdown_notify.notify_one();
    }

    /// Whether shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Run one cycle now, outside the schedule. Returns `None` if a cycle
    /// is already in flight.
    pub async fn trigger(&self) -> Option<Result<ScanStats, ScanJobError>> {
        self.try_run_cycle().await
    }

    async fn try_run_cycle(&self) -> Option<Result<ScanStats, ScanJobError>> {
        let Ok(_guard) = self.run_gate.try_lock() else {
            return None;
        };
        let result = self.job.run_once().await;
        if let Err(e) = &result {
            error!(error = %e, "scan cycle failed");
        }
        Some(result)
    }
}
