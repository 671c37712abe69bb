//! Postgres-backed implementations of the core adapter ports.
//!
//! Thin wrappers over the row-level functions in this crate: row-to-domain
//! conversion and error mapping happen here, nothing else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use gramscan_core::ports::{ContentStore, CredentialStore, RunLog, TargetRegistry};
use gramscan_core::{
    AccountStatus, CollectedComment, CollectedPost, CollectedStory, MonitoredTarget, RunStatus,
    ScanMetrics, ServiceAccount, StoreError, TargetKind,
};

use crate::accounts::{select_oldest_active_account, update_account_status, ServiceAccountRow};
use crate::content::{insert_comment, upsert_post, upsert_story};
use crate::runs::{close_scan_run, open_scan_run};
use crate::targets::{list_active_targets, stamp_target_scanned, MonitoredTargetRow};
use crate::DbError;

fn store_err(context: &str, err: DbError) -> StoreError {
    match err {
        DbError::NotFound => StoreError::NotFound,
        other => StoreError::backend(context, other),
    }
}

impl ServiceAccountRow {
    fn into_domain(self) -> ServiceAccount {
        // The CHECK constraint keeps the column in the known set; an unknown
        // value can only mean a schema drift, so treat it as out of rotation.
        let status = AccountStatus::parse(&self.status).unwrap_or_else(|| {
            tracing::warn!(
                username = %self.username,
                status = %self.status,
                "unknown account status in store; treating as disabled"
            );
            AccountStatus::Disabled
        });
        ServiceAccount {
            username: self.username,
            status,
            last_used_at: self.last_used_at,
            secret_ref: self.secret_ref,
        }
    }
}

impl MonitoredTargetRow {
    fn into_domain(self, kind: TargetKind) -> MonitoredTarget {
        MonitoredTarget {
            kind,
            identifier: self.identifier,
            is_active: self.is_active,
            last_scanned_at: self.last_scanned_at,
        }
    }
}

/// [`CredentialStore`] over the `service_accounts` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn select_oldest_active(&self) -> Result<Option<ServiceAccount>, StoreError> {
        let row = select_oldest_active_account(&self.pool)
            .await
            .map_err(|e| store_err("selecting service account", e))?;
        Ok(row.map(ServiceAccountRow::into_domain))
    }

    async fn set_status(
        &self,
        username: &str,
        status: AccountStatus,
        last_used_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        update_account_status(&self.pool, username, status.as_str(), last_used_at)
            .await
            .map_err(|e| store_err("updating service account status", e))
    }
}

/// [`TargetRegistry`] over the `monitored_targets` table.
#[derive(Clone)]
pub struct PgTargetRegistry {
    pool: PgPool,
}

impl PgTargetRegistry {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TargetRegistry for PgTargetRegistry {
    async fn list_active(&self, kind: TargetKind) -> Result<Vec<MonitoredTarget>, StoreError> {
        let rows = list_active_targets(&self.pool, kind.as_str())
            .await
            .map_err(|e| store_err("listing monitored targets", e))?;
        Ok(rows.into_iter().map(|r| r.into_domain(kind)).collect())
    }

    async fn stamp_scanned(&self, kind: TargetKind, identifier: &str) -> Result<(), StoreError> {
        stamp_target_scanned(&self.pool, kind.as_str(), identifier)
            .await
            .map_err(|e| store_err("stamping target scan time", e))
    }
}

/// [`ContentStore`] over the `posts` / `post_comments` / `stories` tables.
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn save_post(&self, post: &CollectedPost) -> Result<(), StoreError> {
        upsert_post(&self.pool, post)
            .await
            .map_err(|e| store_err("saving post", e))
    }

    async fn save_comment(&self, comment: &CollectedComment) -> Result<(), StoreError> {
        insert_comment(&self.pool, comment)
            .await
            .map_err(|e| store_err("saving comment", e))
    }

    async fn save_story(&self, story: &CollectedStory) -> Result<(), StoreError> {
        upsert_story(&self.pool, story)
            .await
            .map_err(|e| store_err("saving story", e))
    }
}

/// [`RunLog`] over the `scan_runs` table.
#[derive(Clone)]
pub struct PgRunLog {
    pool: PgPool,
}

impl PgRunLog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunLog for PgRunLog {
    async fn open(
        &self,
        run_id: Uuid,
        service: &str,
        job_type: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        open_scan_run(&self.pool, run_id, service, job_type, message)
            .await
            .map_err(|e| store_err("opening scan run record", e))
    }

    async fn close(
        &self,
        run_id: Uuid,
        status: RunStatus,
        message: &str,
        error_detail: Option<&str>,
        metrics: Option<&ScanMetrics>,
    ) -> Result<(), StoreError> {
        let metrics_json = metrics.map(|m| {
            serde_json::to_value(m).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "metrics failed to serialize; storing null");
                serde_json::Value::Null
            })
        });
        close_scan_run(
            &self.pool,
            run_id,
            status.as_str(),
            message,
            error_detail,
            metrics_json.as_ref(),
        )
        .await
        .map_err(|e| store_err("closing scan run record", e))
    }
}
