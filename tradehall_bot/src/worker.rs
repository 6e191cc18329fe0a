use chrono::Utc;
use log::*;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tradehall_engine::{InMemoryOrderRepository, SchedulerApi, SqliteDatabase};

use crate::notifier::LogNotifier;

pub type Scheduler = SchedulerApi<SqliteDatabase, InMemoryOrderRepository, LogNotifier>;

/// Starts the scheduler poll worker.
///
/// One task, one loop: a tick body always runs to completion before the next interval is awaited, so iterations can
/// never overlap, and a missed interval is skipped rather than bursted. Signalling `shutdown` stops the loop after
/// the in-flight tick finishes.
pub fn start_scheduler_worker(
    api: Scheduler,
    poll_interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("🕰️ Scheduler worker started (polling every {poll_interval:?})");
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match api.tick(Utc::now()).await {
                        Ok(report) if report.is_quiet() => trace!("🕰️ Poll tick: nothing to do"),
                        Ok(report) => info!("🕰️ Poll tick: {report}"),
                        // A store outage aborts this tick only; the next interval retries the same work.
                        Err(e) => error!("🕰️ Poll tick failed: {e}"),
                    }
                },
                _ = shutdown.changed() => {
                    info!("🕰️ Scheduler worker shutting down");
                    break;
                },
            }
        }
    })
}
