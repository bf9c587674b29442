use std::time::Duration;

use log::*;
use stockpay_engine::{CycleReport, ReconciliationApi, SqliteDatabase};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::integrations::JsonRpcNode;

/// Starts the reconciliation worker.
///
/// A cycle runs every `interval`. Cycles never overlap: if one overruns, the next tick is delayed rather than
/// doubled up. Sending `true` on the shutdown channel stops the worker once the current cycle (if any) is finished.
pub fn start_reconciliation_worker(
    api: ReconciliationApi<SqliteDatabase, JsonRpcNode>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Reconciliation worker started. Running every {}s", interval.as_secs());
        loop {
            tokio::select! {
                _ = timer.tick() => {},
                _ = shutdown.changed() => {
                    info!("🕰️ Reconciliation worker is shutting down");
                    break;
                },
            }
            trace!("🕰️ Running reconciliation cycle");
            match api.run_cycle().await {
                Ok(report) => log_report(&report),
                Err(e) => error!("🕰️ Reconciliation cycle failed. It will be retried on the next tick. {e}"),
            }
            if *shutdown.borrow() {
                info!("🕰️ Reconciliation worker is shutting down");
                break;
            }
        }
    })
}

/// Tells the worker to stop. Returns `false` if the worker had already gone away, in which case there is nothing
/// left to stop.
pub fn stop_reconciliation_worker(shutdown: &watch::Sender<bool>) -> bool {
    match shutdown.send(true) {
        Ok(()) => true,
        Err(e) => {
            warn!("🕰️ Could not signal the reconciliation worker to stop. It has already exited. {e}");
            false
        },
    }
}

fn log_report(report: &CycleReport) {
    if report.is_quiet() {
        trace!("🕰️ Nothing to do this cycle");
        return;
    }
    info!(
        "🕰️ Cycle complete. {} paid, {} delivered, {} out of stock, {} awaiting stock, {} errors",
        report.newly_paid.len(),
        report.delivered.len(),
        report.out_of_stock.len(),
        report.awaiting_stock,
        report.errors
    );
    debug!("🕰️ Paid: {:?}. Delivered: {:?}. Out of stock: {:?}", report.newly_paid, report.delivered, report.out_of_stock);
}
