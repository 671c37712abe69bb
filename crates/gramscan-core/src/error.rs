//! Failure taxonomies shared across the workspace.
//!
//! `ProviderError` is the flat classification of everything the content
//! provider can do to us; the scan core's recovery logic is a pure mapping
//! over these variants. Transport and parse causes are carried as strings so
//! this crate stays free of HTTP-client dependencies.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the session as unauthenticated. At setup time
    /// this expires the credential; mid-crawl it aborts the run.
    #[error("login required for account {account}")]
    LoginRequired { account: String },

    /// The profile no longer exists.
    #[error("profile not found: {username}")]
    ProfileNotFound { username: String },

    /// The profile is private and not followed by the scanning account.
    #[error("profile {username} is private and not followed by the scanning account")]
    ProfileInaccessible { username: String },

    /// HTTP 429 or the provider's in-band too-many-requests signal.
    #[error("rate limited by provider (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Network-level failure (connect, TLS, timeout, body read).
    #[error("transport error for {context}: {reason}")]
    Transport { context: String, reason: String },

    /// The response body does not match the expected shape.
    #[error("deserialization error for {context}: {reason}")]
    Deserialize { context: String, reason: String },

    /// Any other non-2xx status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Guard against cycling pagination cursors.
    #[error("pagination limit reached for {context}: exceeded {max_pages} pages")]
    PaginationLimit { context: String, max_pages: usize },

    /// The session payload could not be parsed into usable credentials.
    #[error("malformed session material: {reason}")]
    SessionMaterial { reason: String },
}

/// Failure of a store adapter (credential, secret, blob, target, content,
/// or run-log store). Callers generally degrade on these rather than abort;
/// see the crawl engine for the per-site policy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{context}: {reason}")]
    Backend { context: String, reason: String },
}

impl StoreError {
    /// Shorthand for backend failures wrapped with call-site context.
    #[must_use]
    pub fn backend(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}
