use std::sync::Arc;

use chrono::Timelike;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::service::ResetService;

/// Minute-resolution trigger loop.
///
/// Wakes every 60 seconds and asks the service to evaluate all slots against
/// the current wall clock in the configured timezone. Intervals shorter than
/// a minute cannot double-fire (the ledger dedupes within the minute) and
/// longer gaps are not caught up, so the wake period is not load-bearing for
/// correctness, only for latency.
pub struct SchedulerEngine {
    service: Arc<ResetService>,
}

impl SchedulerEngine {
    pub fn new(service: Arc<ResetService>) -> Self {
        Self { service }
    }

    /// Main loop. Ticks every 60 seconds until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(timezone = %self.service.timezone(), "reset scheduler started");

        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(resploot_core::TICK_INTERVAL_SECS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = self.service.now();
                    // Hourly heartbeat so quiet deployments still show life.
                    if now.minute() == 0 {
                        info!(local_time = %now.format("%Y-%m-%d %H:%M %Z"), "scheduler heartbeat");
                    } else {
                        debug!(local_time = %now.format("%H:%M"), "scheduler tick");
                    }
                    let outcomes = self.service.tick(now).await;
                    if !outcomes.is_empty() {
                        let fired = outcomes.iter().filter(|o| o.result.is_ok()).count();
                        info!(due = outcomes.len(), fired, "tick processed due slots");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("reset scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }
}
