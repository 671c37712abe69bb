//! Database operations for the `service_accounts` rotation pool.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `service_accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceAccountRow {
    pub id: i64,
    pub username: String,
    pub status: String,
    pub last_used_at: Option<DateTime<Utc>>,
    pub secret_ref: String,
    pub created_at: DateTime<Utc>,
}

/// Selects the active credential with the oldest `last_used_at`.
///
/// Never-used accounts (`last_used_at IS NULL`) sort first; ties are broken
/// by username so the selection is deterministic. Returns `None` when the
/// pool has no active entries.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn select_oldest_active_account(
    pool: &PgPool,
) -> Result<Option<ServiceAccountRow>, DbError> {
    let row = sqlx::query_as::<_, ServiceAccountRow>(
        "SELECT id, username, status, last_used_at, secret_ref, created_at \
         FROM service_accounts \
         WHERE status = 'active' \
         ORDER BY last_used_at ASC NULLS FIRST, username ASC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists the whole rotation pool in selection order, for operator tooling.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_accounts(pool: &PgPool) -> Result<Vec<ServiceAccountRow>, DbError> {
    let rows = sqlx::query_as::<_, ServiceAccountRow>(
        "SELECT id, username, status, last_used_at, secret_ref, created_at \
         FROM service_accounts \
         ORDER BY last_used_at ASC NULLS FIRST, username ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Updates a credential's status, optionally stamping `last_used_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no account exists with `username`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_account_status(
    pool: &PgPool,
    username: &str,
    status: &str,
    last_used_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE service_accounts \
         SET status = $1, last_used_at = COALESCE($2, last_used_at) \
         WHERE username = $3",
    )
    .bind(status)
    .bind(last_used_at)
    .bind(username)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
