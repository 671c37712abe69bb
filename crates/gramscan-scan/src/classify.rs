//! Maps provider failures to recovery actions.
//!
//! A pure function over the flat [`ProviderError`] taxonomy so the recovery
//! policy is testable without a live provider. Session invalidity is handled
//! at setup time by the session manager; a `LoginRequired` that surfaces
//! mid-crawl lands in the unclassified bucket and aborts the run.

use gramscan_core::ProviderError;

/// What the crawl engine does with a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Log at warning level, leave the target for the next run, continue
    /// with the remaining targets.
    SkipTarget,
    /// Stop the run: emit one warning event, sleep the randomized cooldown,
    /// and return control with partial results. The credential stays
    /// healthy; the limiting is provider-side, not credential-specific.
    CooldownAbort,
    /// Critical, run-aborting failure; surfaced as the run's terminal error.
    Abort,
}

#[must_use]
pub fn classify(err: &ProviderError) -> RecoveryAction {
    match err {
        ProviderError::ProfileNotFound { .. } | ProviderError::ProfileInaccessible { .. } => {
            RecoveryAction::SkipTarget
        }
        ProviderError::RateLimited { .. } => RecoveryAction::CooldownAbort,
        ProviderError::LoginRequired { .. }
        | ProviderError::Transport { .. }
        | ProviderError::Deserialize { .. }
        | ProviderError::UnexpectedStatus { .. }
        | ProviderError::PaginationLimit { .. }
        | ProviderError::SessionMaterial { .. } => RecoveryAction::Abort,
    }
}
