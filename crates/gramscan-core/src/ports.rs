//! Adapter contracts consumed by the scan orchestration core.
//!
//! Each trait is one external collaborator: the stores are thin I/O wrappers
//! with no state machine of their own, and the provider is the only source
//! of crawlable content. The core holds them as trait objects so tests can
//! substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ProviderError, StoreError};
use crate::model::{
    AccountStatus, CollectedComment, CollectedPost, CollectedStory, MonitoredTarget, Page,
    ProfileHandle, ProviderComment, ProviderPost, ProviderStory, RunStatus, ScanMetrics,
    ServiceAccount, TargetKind,
};

/// Selection and status updates for the credential rotation pool.
///
/// Selection is least-recently-used: the active credential with the smallest
/// `last_used_at` (never-used first). There is no checkout marker beyond the
/// status filter, so concurrent scan processes against the same pool require
/// an external lock this generation does not provide.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the oldest-used active credential, or `None` when the pool
    /// has no active entries.
    async fn select_oldest_active(&self) -> Result<Option<ServiceAccount>, StoreError>;

    /// Updates a credential's status, optionally stamping `last_used_at`.
    async fn set_status(
        &self,
        username: &str,
        status: AccountStatus,
        last_used_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;
}

/// Fetches the binary session payload bound to a credential.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the payload for `reference`, or `None` when the secret does
    /// not exist. An empty payload is returned as-is; the caller decides
    /// whether emptiness is fatal.
    async fn fetch_payload(&self, reference: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Uploads media bytes fetched from the provider.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores `bytes` at `destination` (a relative, deterministic path) and
    /// returns the resulting locator.
    async fn upload(&self, bytes: Vec<u8>, destination: &str) -> Result<String, StoreError>;
}

/// Read/stamp access to the monitored-target registry. Targets are created
/// and edited by an external administrative process.
#[async_trait]
pub trait TargetRegistry: Send + Sync {
    async fn list_active(&self, kind: TargetKind) -> Result<Vec<MonitoredTarget>, StoreError>;

    /// Stamps `last_scanned_at = now` after a completed scan of the target.
    async fn stamp_scanned(&self, kind: TargetKind, identifier: &str) -> Result<(), StoreError>;
}

/// Persistence for collected content snapshots. All records land with
/// `nlp_status = pending` for the downstream analysis stage.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save_post(&self, post: &CollectedPost) -> Result<(), StoreError>;
    async fn save_comment(&self, comment: &CollectedComment) -> Result<(), StoreError>;
    async fn save_story(&self, story: &CollectedStory) -> Result<(), StoreError>;
}

/// Run-record log with write-once-then-update-once semantics: `open` creates
/// the `started` record, `close` sets the single terminal state.
#[async_trait]
pub trait RunLog: Send + Sync {
    async fn open(
        &self,
        run_id: Uuid,
        service: &str,
        job_type: &str,
        message: &str,
    ) -> Result<(), StoreError>;

    async fn close(
        &self,
        run_id: Uuid,
        status: RunStatus,
        message: &str,
        error_detail: Option<&str>,
        metrics: Option<&ScanMetrics>,
    ) -> Result<(), StoreError>;
}

/// The content provider. `open_session` materializes session credentials
/// from the secret payload; everything else happens on the returned session.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn open_session(
        &self,
        account: &str,
        material: &[u8],
    ) -> Result<Box<dyn ProviderSession>, ProviderError>;
}

/// An authenticated provider session, valid for the duration of one run.
/// Passed explicitly through the crawl rather than held as shared state.
#[async_trait]
pub trait ProviderSession: Send + Sync {
    /// Lightweight authenticated probe; `LoginRequired` here means the
    /// session material is stale.
    async fn verify(&self) -> Result<(), ProviderError>;

    /// Resolves a monitored username to its provider-side identity.
    async fn resolve_profile(&self, username: &str) -> Result<ProfileHandle, ProviderError>;

    /// One page of the profile's post feed, oldest cursor semantics owned by
    /// the provider.
    async fn posts_page(
        &self,
        profile: &ProfileHandle,
        cursor: Option<&str>,
    ) -> Result<Page<ProviderPost>, ProviderError>;

    /// One page of a post's comment thread.
    async fn comments_page(
        &self,
        media_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<ProviderComment>, ProviderError>;

    /// The profile's currently active story items (not paginated; the
    /// provider returns the whole reel).
    async fn stories(&self, profile: &ProfileHandle) -> Result<Vec<ProviderStory>, ProviderError>;

    /// Downloads media bytes over plain HTTP with a bounded timeout.
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}
