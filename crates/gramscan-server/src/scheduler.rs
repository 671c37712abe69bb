//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring daily scan. The scheduler is the fire-and-forget boundary for
//! scheduled runs: a failed run is logged and the process keeps serving.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use gramscan_scan::ScanRunner;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    runner: Arc<ScanRunner>,
    scan_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_daily_scan_job(&scheduler, runner, scan_cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Registers the recurring daily scan at the configured cron schedule
/// (default 03:00 UTC, when monitored accounts are quiet).
async fn register_daily_scan_job(
    scheduler: &JobScheduler,
    runner: Arc<ScanRunner>,
    scan_cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(scan_cron, move |_uuid, _lock| {
        let runner = Arc::clone(&runner);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily scan run");
            match runner.run_daily_scan().await {
                Ok(summary) => {
                    tracing::info!(
                        run_id = %summary.run_id,
                        status = %summary.status,
                        "scheduler: daily scan run finished"
                    );
                }
                Err(e) => {
                    // The run record already carries the terminal error;
                    // the scheduled boundary only logs and keeps running.
                    tracing::error!(error = %format!("{e:#}"), "scheduler: daily scan run failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
