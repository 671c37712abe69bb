//! Database operations for `scan_runs` records.
//!
//! A run record is written once at start and updated at most once more with
//! its terminal state; the close guards on `status = 'started'` so a second
//! terminal write is a typed error rather than a silent overwrite.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `scan_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanRunRow {
    pub id: i64,
    pub run_id: Uuid,
    pub service: String,
    pub job_type: String,
    pub status: String,
    pub message: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
    pub metrics: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Creates the `started` record for a new run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate
/// `run_id`).
pub async fn open_scan_run(
    pool: &PgPool,
    run_id: Uuid,
    service: &str,
    job_type: &str,
    message: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO scan_runs (run_id, service, job_type, status, message) \
         VALUES ($1, $2, $3, 'started', $4)",
    )
    .bind(run_id)
    .bind(service)
    .bind(job_type)
    .bind(message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Writes the single terminal state of a run: status, end time, message,
/// and optionally the error detail and aggregate metrics.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is missing or
/// already closed, or [`DbError::Sqlx`] if the update fails.
pub async fn close_scan_run(
    pool: &PgPool,
    run_id: Uuid,
    status: &str,
    message: &str,
    error_detail: Option<&str>,
    metrics: Option<&serde_json::Value>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scan_runs \
         SET status = $1, message = $2, end_time = NOW(), \
             error_detail = $3, metrics = $4 \
         WHERE run_id = $5 AND status = 'started'",
    )
    .bind(status)
    .bind(message)
    .bind(error_detail)
    .bind(metrics)
    .bind(run_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition { run_id });
    }

    Ok(())
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_runs(pool: &PgPool, limit: i64) -> Result<Vec<ScanRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ScanRunRow>(
        "SELECT id, run_id, service, job_type, status, message, \
                start_time, end_time, error_detail, metrics, created_at \
         FROM scan_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
