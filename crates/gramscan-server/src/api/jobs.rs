//! Job endpoints: the scan trigger and the run-record listing.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{map_db_error, normalize_limit, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct ScanAccepted {
    pub started: bool,
}

/// `POST /jobs/start-daily-scan`: returns 202 immediately; the run
/// executes in a detached task. Designed to be hit by an external cron
/// trigger as well as operators.
///
/// Failures never surface here: they are observable through the run record
/// and logs only.
pub(super) async fn start_daily_scan(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    tracing::info!("daily scan trigger received; starting run in background");

    let runner = Arc::clone(&state.runner);
    tokio::spawn(async move {
        if let Err(e) = runner.run_daily_scan().await {
            tracing::error!(error = %format!("{e:#}"), "background scan run failed");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: ScanAccepted { started: true },
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}

#[derive(Debug, Deserialize)]
pub(super) struct ListRunsParams {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ScanRunItem {
    pub run_id: Uuid,
    pub service: String,
    pub job_type: String,
    pub status: String,
    pub message: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
    pub metrics: Option<serde_json::Value>,
}

/// `GET /jobs/runs?limit=N`: the most recent scan runs, newest first.
pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListRunsParams>,
) -> impl IntoResponse {
    let limit = normalize_limit(params.limit);

    match gramscan_store::list_recent_runs(&state.pool, limit).await {
        Ok(rows) => {
            let items: Vec<ScanRunItem> = rows
                .into_iter()
                .map(|row| ScanRunItem {
                    run_id: row.run_id,
                    service: row.service,
                    job_type: row.job_type,
                    status: row.status,
                    message: row.message,
                    start_time: row.start_time,
                    end_time: row.end_time,
                    error_detail: row.error_detail,
                    metrics: row.metrics,
                })
                .collect();
            Json(ApiResponse {
                data: items,
                meta: ResponseMeta::new(req_id.0),
            })
            .into_response()
        }
        Err(e) => map_db_error(req_id.0, &e).into_response(),
    }
}
