//! Domain model shared across the workspace.
//!
//! Two families of types live here: persisted shapes (what the store
//! adapters read and write) and provider shapes (what the content provider
//! returns page by page). The crawl engine converts between them; nothing
//! else should.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a scanning credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// Selectable for rotation.
    Active,
    /// The stored session was rejected by the provider; excluded from
    /// selection until renewed externally.
    SessionExpired,
    /// Administratively removed from rotation.
    Disabled,
}

impl AccountStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::SessionExpired => "session_expired",
            AccountStatus::Disabled => "disabled",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "session_expired" => Some(AccountStatus::SessionExpired),
            "disabled" => Some(AccountStatus::Disabled),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rotation-managed login identity used to authenticate against the
/// content provider.
#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub username: String,
    pub status: AccountStatus,
    /// `None` for accounts that have never been used; these sort first in
    /// the rotation order.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Opaque locator for the session payload in the secret store.
    pub secret_ref: String,
}

/// What kind of thing a monitored target identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Profile,
    Hashtag,
}

impl TargetKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Profile => "profile",
            TargetKind::Hashtag => "hashtag",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(TargetKind::Profile),
            "hashtag" => Some(TargetKind::Hashtag),
            _ => None,
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A profile or hashtag registered for scanning by the administrative
/// process. The scan core only reads active targets and stamps
/// `last_scanned_at`.
#[derive(Debug, Clone)]
pub struct MonitoredTarget {
    pub kind: TargetKind,
    pub identifier: String,
    pub is_active: bool,
    pub last_scanned_at: Option<DateTime<Utc>>,
}

/// Media attachment kind, which also decides the storage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// File extension used in blob-store paths.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// A monitored username resolved to its provider-side identity.
#[derive(Debug, Clone)]
pub struct ProfileHandle {
    pub user_id: String,
    pub username: String,
}

/// One post as returned by the provider feed.
#[derive(Debug, Clone)]
pub struct ProviderPost {
    /// Provider-internal media id; needed to enumerate comments.
    pub media_id: String,
    pub shortcode: String,
    pub taken_at: DateTime<Utc>,
    pub caption: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub media_kind: MediaKind,
    pub media_url: Option<String>,
}

/// One comment under a post.
#[derive(Debug, Clone)]
pub struct ProviderComment {
    pub comment_id: String,
    pub author_username: String,
    pub text: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub like_count: i64,
}

/// One story item from a profile's active reel.
#[derive(Debug, Clone)]
pub struct ProviderStory {
    pub story_id: String,
    pub taken_at: DateTime<Utc>,
    pub media_kind: MediaKind,
    pub media_url: Option<String>,
}

/// One page of a cursor-driven enumeration. `next_cursor = None` means the
/// enumeration is exhausted.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// A post snapshot ready for persistence. `media_ref` is the blob-store
/// locator, or `None` when the media could not be fetched or stored.
#[derive(Debug, Clone)]
pub struct CollectedPost {
    pub shortcode: String,
    pub media_id: String,
    pub owner_username: String,
    pub caption: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
    pub media_kind: MediaKind,
    pub media_ref: Option<String>,
}

/// A comment snapshot, persisted as a child of its post.
#[derive(Debug, Clone)]
pub struct CollectedComment {
    pub post_shortcode: String,
    pub comment_id: String,
    pub author_username: String,
    pub text: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub like_count: i64,
}

/// A story snapshot. Stories are ephemeral at the source, so the snapshot
/// carries its own expiry.
#[derive(Debug, Clone)]
pub struct CollectedStory {
    pub story_id: String,
    pub owner_username: String,
    pub captured_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub media_kind: MediaKind,
    pub media_ref: Option<String>,
}

/// Expiry of a story snapshot: capture time plus the provider's 24-hour
/// story lifetime.
#[must_use]
pub fn story_expiry(captured_at: DateTime<Utc>) -> DateTime<Utc> {
    captured_at + Duration::hours(24)
}

/// Terminal and non-terminal states of a scan run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Started,
    Completed,
    /// Finished early on a provider rate limit; partial results persisted.
    Warning,
    Error,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Started => "started",
            RunStatus::Completed => "completed",
            RunStatus::Warning => "warning",
            RunStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counters for one scan run, serialized into the run record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetrics {
    pub targets_scanned: u32,
    pub targets_skipped: u32,
    pub posts_collected: u32,
    pub comments_collected: u32,
    pub stories_collected: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn account_status_round_trips_through_str() {
        for status in [
            AccountStatus::Active,
            AccountStatus::SessionExpired,
            AccountStatus::Disabled,
        ] {
            assert_eq!(AccountStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AccountStatus::parse("banned"), None);
    }

    #[test]
    fn media_kind_extensions() {
        assert_eq!(MediaKind::Image.extension(), "jpg");
        assert_eq!(MediaKind::Video.extension(), "mp4");
    }

    #[test]
    fn story_expiry_is_24_hours_after_capture() {
        let captured = Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 6, 2, 18, 30, 0).unwrap();
        assert_eq!(story_expiry(captured), expected);
    }

    #[test]
    fn scan_metrics_serializes_with_field_names() {
        let metrics = ScanMetrics {
            targets_scanned: 2,
            targets_skipped: 1,
            posts_collected: 5,
            comments_collected: 100,
            stories_collected: 3,
        };
        let json = serde_json::to_value(metrics).expect("serialize metrics");
        assert_eq!(json["targets_scanned"], 2);
        assert_eq!(json["comments_collected"], 100);
    }
}
