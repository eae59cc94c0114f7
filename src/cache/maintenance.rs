//! Background Maintenance
//!
//! Periodic expiry sweep plus opportunistic warm → hot promotion, run as an
//! owned tokio task with an explicit stop handle.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::manager::TieredCache;
use crate::error::{Error, Result};

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Expired entries removed across all tiers
    pub expired: usize,
    /// Warm entries moved into spare hot capacity
    pub promoted: usize,
}

impl MaintenanceReport {
    /// Whether the pass changed anything
    pub fn is_noop(&self) -> bool {
        self.expired == 0 && self.promoted == 0
    }
}

/// Handle to a running maintenance task
///
/// Dropping the handle signals the task to stop; [`stop`](Self::stop) also
/// waits for it to finish.
#[derive(Debug)]
pub struct MaintenanceHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    interval: Duration,
}

impl MaintenanceHandle {
    /// Interval between passes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the task is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal the task to stop without waiting
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Stop the task and wait for it to exit
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Cache maintenance task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn the maintenance loop for `cache` on the current runtime
pub(crate) fn spawn<V: Send + 'static>(
    cache: Weak<TieredCache<V>>,
    period: Duration,
) -> Result<MaintenanceHandle> {
    let runtime = Handle::try_current().map_err(|e| {
        Error::Runtime(format!("cache maintenance requires a tokio runtime: {}", e))
    })?;

    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = runtime.spawn(async move {
        info!(interval = ?period, "Starting cache maintenance");

        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Cache maintenance stopped");
                    break;
                }

                _ = tick.tick() => {
                    let Some(cache) = cache.upgrade() else {
                        debug!("Cache dropped, maintenance exiting");
                        break;
                    };

                    let report = cache.run_maintenance();
                    if report.is_noop() {
                        debug!("Cache maintenance pass: nothing to do");
                    } else {
                        info!(
                            expired = report.expired,
                            promoted = report.promoted,
                            entries = cache.len(),
                            "Cache maintenance pass"
                        );
                    }
                }
            }
        }
    });

    Ok(MaintenanceHandle {
        cancel,
        task: Some(task),
        interval: period,
    })
}

// =============================================================================
// Tests
// =============================================================================
