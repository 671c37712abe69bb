//! Top-level entry point for one scan run.
//!
//! Opens the run record, acquires a session, drives the crawl, and writes
//! exactly one terminal record. The crawl runs inside its own task so a
//! panic surfaces as a `JoinError` instead of skipping teardown; the
//! credential release happens exactly once on every outcome before the
//! terminal write. Errors are re-raised after being recorded; the
//! triggering boundary decides whether they are fatal.

use std::sync::Arc;

use uuid::Uuid;

use gramscan_core::ports::RunLog;
use gramscan_core::{RunStatus, ScanMetrics};

use crate::crawl::CrawlEngine;
use crate::session::SessionManager;

pub const SERVICE_NAME: &str = "gramscan";
pub const JOB_TYPE_DAILY_SCAN: &str = "daily_scan";

/// What a finished (or failed-but-recorded) run looked like.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub metrics: ScanMetrics,
}

pub struct ScanRunner {
    sessions: SessionManager,
    engine: Arc<CrawlEngine>,
    run_log: Arc<dyn RunLog>,
}

impl ScanRunner {
    #[must_use]
    pub fn new(sessions: SessionManager, engine: CrawlEngine, run_log: Arc<dyn RunLog>) -> Self {
        Self {
            sessions,
            engine: Arc::new(engine),
            run_log,
        }
    }

    /// Executes one full scan run.
    ///
    /// # Errors
    ///
    /// Re-raises setup failures, critical crawl failures, and crawl panics
    /// after the terminal run record is written. A rate-limited early stop
    /// is not an error; it returns a `Warning` summary.
    pub async fn run_daily_scan(&self) -> anyhow::Result<RunSummary> {
        let run_id = Uuid::new_v4();
        tracing::info!(run_id = %run_id, "starting daily scan run");

        if let Err(e) = self
            .run_log
            .open(
                run_id,
                SERVICE_NAME,
                JOB_TYPE_DAILY_SCAN,
                "daily scan of monitored profiles starting",
            )
            .await
        {
            // The run record is observability, not a precondition.
            tracing::error!(run_id = %run_id, error = %e, "failed to open run record; continuing");
        }

        let session = match self.sessions.acquire(run_id).await {
            Ok(session) => Arc::new(session),
            Err(err) => {
                let err = anyhow::Error::new(err);
                let detail = format!("{err:#}");
                tracing::error!(run_id = %run_id, error = %detail, "session setup failed; run aborted");
                self.close_run(
                    run_id,
                    RunStatus::Error,
                    "scan aborted during session setup",
                    Some(&detail),
                    None,
                )
                .await;
                return Err(err);
            }
        };

        let engine = Arc::clone(&self.engine);
        let crawl_session = Arc::clone(&session);
        let outcome =
            tokio::spawn(async move { engine.run(crawl_session.session.as_ref()).await }).await;

        // Exactly once, before the terminal write, whatever happened above.
        self.sessions.release(&session).await;

        match outcome {
            Ok(Ok(report)) => {
                let (status, message) = if report.rate_limited {
                    (
                        RunStatus::Warning,
                        "scan stopped early: provider rate limit",
                    )
                } else {
                    (RunStatus::Completed, "daily scan completed")
                };
                self.close_run(run_id, status, message, None, Some(&report.metrics))
                    .await;
                tracing::info!(
                    run_id = %run_id,
                    status = %status,
                    targets_scanned = report.metrics.targets_scanned,
                    posts_collected = report.metrics.posts_collected,
                    "daily scan run finished"
                );
                Ok(RunSummary {
                    run_id,
                    status,
                    metrics: report.metrics,
                })
            }
            Ok(Err(crawl_err)) => {
                let err = anyhow::Error::new(crawl_err);
                let detail = format!("{err:#}");
                tracing::error!(run_id = %run_id, error = %detail, "daily scan aborted on critical failure");
                self.close_run(
                    run_id,
                    RunStatus::Error,
                    "scan aborted on critical failure",
                    Some(&detail),
                    None,
                )
                .await;
                Err(err)
            }
            Err(join_err) => {
                let detail = format!("scan task panicked: {join_err}");
                tracing::error!(run_id = %run_id, error = %detail, "daily scan task panicked");
                self.close_run(run_id, RunStatus::Error, "scan task panicked", Some(&detail), None)
                    .await;
                Err(anyhow::anyhow!(detail))
            }
        }
    }

    async fn close_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        message: &str,
        error_detail: Option<&str>,
        metrics: Option<&ScanMetrics>,
    ) {
        if let Err(e) = self
            .run_log
            .close(run_id, status, message, error_detail, metrics)
            .await
        {
            tracing::error!(run_id = %run_id, error = %e, "failed to write terminal run record");
        }
    }
}
