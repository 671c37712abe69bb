//! Database operations for the `monitored_targets` registry.
//!
//! Targets are created and edited by an external administrative process;
//! the scanner only lists active entries and stamps scan completion.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `monitored_targets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonitoredTargetRow {
    pub id: i64,
    pub kind: String,
    pub identifier: String,
    pub is_active: bool,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Lists the active targets of one kind, longest-unscanned first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_targets(
    pool: &PgPool,
    kind: &str,
) -> Result<Vec<MonitoredTargetRow>, DbError> {
    let rows = sqlx::query_as::<_, MonitoredTargetRow>(
        "SELECT id, kind, identifier, is_active, last_scanned_at, created_at \
         FROM monitored_targets \
         WHERE kind = $1 AND is_active = TRUE \
         ORDER BY last_scanned_at ASC NULLS FIRST, identifier ASC",
    )
    .bind(kind)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Stamps `last_scanned_at = NOW()` on a target after a completed scan.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the target does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn stamp_target_scanned(
    pool: &PgPool,
    kind: &str,
    identifier: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE monitored_targets \
         SET last_scanned_at = NOW() \
         WHERE kind = $1 AND identifier = $2",
    )
    .bind(kind)
    .bind(identifier)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
