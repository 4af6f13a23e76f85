use crate::services::{StatisticsSink, SyncPipeline};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument};

/// Periodic sync loop for one delivery site.
///
/// Cycles run strictly one at a time: the loop awaits the running cycle
/// before sleeping, so a new tick can never overlap a slow one. Cycle
/// failures are logged and the loop keeps going; the failed window is
/// re-planned on the next iteration because progress only advances on
/// success.
#[instrument(skip(pipeline, interval), fields(site_id = %pipeline.site_id()))]
pub async fn run<S: StatisticsSink>(pipeline: SyncPipeline<S>, interval: Duration) {
    info!(
        interval_secs = interval.as_secs(),
        "Starting sync worker"
    );

    let mut iteration_count = 0u64;

    loop {
        iteration_count += 1;

        match pipeline.run_cycle(false, None).await {
            Ok(summary) => {
                info!(
                    iteration = iteration_count,
                    last_imported_date = ?summary.last_imported_date,
                    last_spot_price_eur_per_kwh = ?summary.last_spot_price_eur_per_kwh,
                    "Sync worker: cycle completed"
                );
            }
            Err(e) if e.needs_reauth() => {
                error!(
                    iteration = iteration_count,
                    error = %e,
                    "Sync worker: access token rejected, run 'helensync reauth' to continue importing"
                );
            }
            Err(e) => {
                error!(
                    iteration = iteration_count,
                    error = %e,
                    "Sync worker: cycle failed, same window will be retried next interval"
                );
            }
        }

        sleep(interval).await;
    }
}
