//! Scan session lifecycle: credential checkout, session materialization,
//! validation, and guaranteed release.
//!
//! The session manager owns one credential for the duration of a run. The
//! session material is spooled to a short-lived local file before the
//! provider session opens, and that file is erased on every exit path: an
//! explicit `release`, an early setup failure, or, via the `Drop` guard on
//! [`ScanSession`], an abandoned handle.
//!
//! Checkout is status filtering only: there is no distributed lock, so
//! concurrent scan processes against the same credential pool need an
//! external mutual-exclusion mechanism this generation does not provide.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use gramscan_core::ports::{ContentProvider, CredentialStore, ProviderSession, SecretStore};
use gramscan_core::{AccountStatus, ProviderError, ServiceAccount};

#[derive(Debug, Error)]
pub enum SetupError {
    /// The rotation pool has no active credential. Reported, not retried:
    /// an empty pool is an operational problem, not a transient one.
    #[error("no active service account available in the rotation pool")]
    NoCredentialAvailable,

    /// The secret store has no payload (or an empty one) for the selected
    /// credential.
    #[error("session payload for secret reference {reference} is missing or empty")]
    SecretUnavailable { reference: String },

    /// The provider rejected the session as unauthenticated. The credential
    /// has been marked `session_expired` and will not be selected again
    /// until renewed externally.
    #[error("session for account {account} was rejected as invalid")]
    SessionInvalid { account: String },

    /// Any other setup failure, with the underlying cause preserved.
    #[error("session setup failed while {context}")]
    SetupFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SetupError {
    fn failed(
        context: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SetupError::SetupFailed {
            context: context.to_string(),
            source: Box::new(source),
        }
    }
}

/// A checked-out credential with its materialized provider session.
///
/// Passed explicitly through the crawl rather than held as shared state, so
/// concurrent runs stay possible without refactoring.
pub struct ScanSession {
    pub account: ServiceAccount,
    pub session: Box<dyn ProviderSession>,
    spool_path: PathBuf,
    erased: AtomicBool,
}

impl ScanSession {
    /// Removes the spooled session material. Idempotent; a missing file is
    /// fine (another path already erased it).
    fn erase_material(&self) {
        if self.erased.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.spool_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.spool_path.display(),
                    error = %e,
                    "failed to erase spooled session material"
                );
            }
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.erase_material();
    }
}

/// Owns credential acquisition and release for scan runs.
pub struct SessionManager {
    credentials: Arc<dyn CredentialStore>,
    secrets: Arc<dyn SecretStore>,
    provider: Arc<dyn ContentProvider>,
    spool_dir: PathBuf,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        secrets: Arc<dyn SecretStore>,
        provider: Arc<dyn ContentProvider>,
        spool_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            credentials,
            secrets,
            provider,
            spool_dir: spool_dir.into(),
        }
    }

    /// Checks the least-recently-used active credential out of the pool,
    /// materializes its session, and validates it with an authenticated
    /// probe.
    ///
    /// # Errors
    ///
    /// All variants of [`SetupError`]; none are retryable within this run.
    pub async fn acquire(&self, run_id: Uuid) -> Result<ScanSession, SetupError> {
        let account = self
            .credentials
            .select_oldest_active()
            .await
            .map_err(|e| SetupError::failed("selecting a credential", e))?
            .ok_or(SetupError::NoCredentialAvailable)?;
        tracing::info!(
            run_id = %run_id,
            account = %account.username,
            "service account selected for scan"
        );

        let payload = self
            .secrets
            .fetch_payload(&account.secret_ref)
            .await
            .map_err(|e| SetupError::failed("fetching the session payload", e))?;
        let payload = match payload {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                return Err(SetupError::SecretUnavailable {
                    reference: account.secret_ref.clone(),
                })
            }
        };

        tokio::fs::create_dir_all(&self.spool_dir)
            .await
            .map_err(|e| SetupError::failed("preparing the session spool directory", e))?;
        let spool_path = self
            .spool_dir
            .join(format!("{run_id}-{}.session", account.username));
        tokio::fs::write(&spool_path, &payload)
            .await
            .map_err(|e| SetupError::failed("spooling the session material", e))?;

        let session = match self.provider.open_session(&account.username, &payload).await {
            Ok(session) => session,
            Err(err) => {
                remove_spool(&spool_path).await;
                return Err(self.invalid_or_failed(&account, err, "opening the session").await);
            }
        };

        if let Err(err) = session.verify().await {
            remove_spool(&spool_path).await;
            return Err(self.invalid_or_failed(&account, err, "validating the session").await);
        }

        Ok(ScanSession {
            account,
            session,
            spool_path,
            erased: AtomicBool::new(false),
        })
    }

    /// Returns a checked-out credential to the pool: erases the spooled
    /// material, resets the status to `active`, and stamps `last_used_at`
    /// so the credential moves to the back of the rotation order.
    ///
    /// Invoked exactly once per successful acquire, on every run outcome.
    /// A failed store write is logged, not propagated; there is nothing
    /// useful a caller could do with it at teardown time.
    pub async fn release(&self, session: &ScanSession) {
        session.erase_material();

        if let Err(e) = self
            .credentials
            .set_status(&session.account.username, AccountStatus::Active, Some(Utc::now()))
            .await
        {
            tracing::error!(
                account = %session.account.username,
                error = %e,
                "failed to return service account to the rotation pool"
            );
        } else {
            tracing::info!(
                account = %session.account.username,
                "service account released back to rotation"
            );
        }
    }

    /// On an authentication-invalidity signal, expires the credential and
    /// reports `SessionInvalid`; anything else becomes `SetupFailed`.
    async fn invalid_or_failed(
        &self,
        account: &ServiceAccount,
        err: ProviderError,
        context: &str,
    ) -> SetupError {
        if !matches!(err, ProviderError::LoginRequired { .. }) {
            return SetupError::failed(context, err);
        }

        tracing::warn!(
            account = %account.username,
            "provider rejected the session; marking account session_expired"
        );
        if let Err(e) = self
            .credentials
            .set_status(&account.username, AccountStatus::SessionExpired, None)
            .await
        {
            tracing::error!(
                account = %account.username,
                error = %e,
                "failed to mark account session_expired"
            );
        }
        SetupError::SessionInvalid {
            account: account.username.clone(),
        }
    }
}

async fn remove_spool(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to erase spooled session material"
            );
        }
    }
}
