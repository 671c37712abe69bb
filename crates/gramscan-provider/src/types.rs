//! Wire shapes for the provider's JSON API, plus conversions into the
//! domain provider types.
//!
//! Only the fields the scanner consumes are modeled; everything else in the
//! responses is ignored by serde.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use gramscan_core::{MediaKind, ProviderComment, ProviderError, ProviderPost, ProviderStory};

/// The session payload stored in the secret vault: the cookie triple of an
/// interactively established login.
#[derive(Debug, Deserialize)]
pub struct SessionMaterial {
    pub sessionid: String,
    pub csrftoken: String,
    pub ds_user_id: String,
}

impl SessionMaterial {
    /// Parses the raw secret payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::SessionMaterial`] when the payload is not
    /// the expected JSON document.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProviderError> {
        serde_json::from_slice(bytes).map_err(|e| ProviderError::SessionMaterial {
            reason: e.to_string(),
        })
    }

    /// Renders the material as a `Cookie` header value.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        format!(
            "sessionid={}; csrftoken={}; ds_user_id={}",
            self.sessionid, self.csrftoken, self.ds_user_id
        )
    }
}

/// Generic `{"status": "..."}` envelope used by probe endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusEnvelope {
    #[allow(dead_code)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebProfileResponse {
    pub data: WebProfileData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebProfileData {
    /// `null` when the profile does not exist.
    pub user: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub followed_by_viewer: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedResponse {
    #[serde(default)]
    pub items: Vec<WireFeedItem>,
    #[serde(default)]
    pub more_available: bool,
    pub next_max_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireFeedItem {
    pub pk: i64,
    pub code: String,
    pub taken_at: i64,
    pub caption: Option<WireCaption>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    pub media_type: u8,
    pub image_versions2: Option<WireImageVersions>,
    pub video_versions: Option<Vec<WireVideoVersion>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCaption {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireImageVersions {
    #[serde(default)]
    pub candidates: Vec<WireMediaCandidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMediaCandidate {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireVideoVersion {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentsResponse {
    #[serde(default)]
    pub comments: Vec<WireComment>,
    pub next_max_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireComment {
    pub pk: i64,
    pub user: WireCommentUser,
    pub text: String,
    pub created_at: Option<i64>,
    #[serde(default)]
    pub comment_like_count: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCommentUser {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReelResponse {
    /// `null` when the profile has no active stories.
    pub reel: Option<WireReel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireReel {
    #[serde(default)]
    pub items: Vec<WireStoryItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStoryItem {
    pub pk: i64,
    pub taken_at: i64,
    pub media_type: u8,
    pub image_versions2: Option<WireImageVersions>,
    pub video_versions: Option<Vec<WireVideoVersion>>,
}

fn timestamp(secs: i64, context: &str) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| ProviderError::Deserialize {
        context: context.to_string(),
        reason: format!("timestamp out of range: {secs}"),
    })
}

/// `media_type` 2 is video; 1 (image) and 8 (carousel, first frame) are
/// stored as images.
fn media_parts(
    media_type: u8,
    images: Option<WireImageVersions>,
    videos: Option<Vec<WireVideoVersion>>,
) -> (MediaKind, Option<String>) {
    if media_type == 2 {
        let url = videos.and_then(|mut v| {
            if v.is_empty() {
                None
            } else {
                Some(v.remove(0).url)
            }
        });
        (MediaKind::Video, url)
    } else {
        let url = images.and_then(|i| i.candidates.into_iter().next().map(|c| c.url));
        (MediaKind::Image, url)
    }
}

impl WireFeedItem {
    pub(crate) fn into_post(self) -> Result<ProviderPost, ProviderError> {
        let taken_at = timestamp(self.taken_at, "feed item")?;
        let (media_kind, media_url) =
            media_parts(self.media_type, self.image_versions2, self.video_versions);
        Ok(ProviderPost {
            media_id: self.pk.to_string(),
            shortcode: self.code,
            taken_at,
            caption: self.caption.map(|c| c.text),
            like_count: self.like_count,
            comment_count: self.comment_count,
            media_kind,
            media_url,
        })
    }
}

impl WireComment {
    pub(crate) fn into_comment(self) -> ProviderComment {
        // A comment with an unparseable timestamp is still worth keeping;
        // the column is nullable.
        let posted_at = self.created_at.and_then(|t| DateTime::from_timestamp(t, 0));
        ProviderComment {
            comment_id: self.pk.to_string(),
            author_username: self.user.username,
            text: self.text,
            posted_at,
            like_count: self.comment_like_count,
        }
    }
}

impl WireStoryItem {
    pub(crate) fn into_story(self) -> Result<ProviderStory, ProviderError> {
        let taken_at = timestamp(self.taken_at, "story item")?;
        let (media_kind, media_url) =
            media_parts(self.media_type, self.image_versions2, self.video_versions);
        Ok(ProviderStory {
            story_id: self.pk.to_string(),
            taken_at,
            media_kind,
            media_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_material_parses_and_renders_cookie() {
        let material =
            SessionMaterial::parse(br#"{"sessionid":"abc","csrftoken":"tok","ds_user_id":"42"}"#)
                .expect("parse");
        assert_eq!(
            material.cookie_header(),
            "sessionid=abc; csrftoken=tok; ds_user_id=42"
        );
    }

    #[test]
    fn session_material_rejects_garbage() {
        let result = SessionMaterial::parse(b"\x80\x81 not json");
        assert!(matches!(
            result,
            Err(ProviderError::SessionMaterial { .. })
        ));
    }

    #[test]
    fn feed_item_converts_image_post() {
        let item: WireFeedItem = serde_json::from_value(serde_json::json!({
            "pk": 3_561_002_i64,
            "code": "Cxyz1",
            "taken_at": 1_748_790_000_i64,
            "caption": {"text": "sunset"},
            "like_count": 12,
            "comment_count": 3,
            "media_type": 1,
            "image_versions2": {"candidates": [{"url": "https://cdn.example/p.jpg"}]}
        }))
        .expect("deserialize");

        let post = item.into_post().expect("convert");
        assert_eq!(post.media_id, "3561002");
        assert_eq!(post.shortcode, "Cxyz1");
        assert_eq!(post.caption.as_deref(), Some("sunset"));
        assert_eq!(post.media_kind, MediaKind::Image);
        assert_eq!(post.media_url.as_deref(), Some("https://cdn.example/p.jpg"));
    }

    #[test]
    fn feed_item_converts_video_post() {
        let item: WireFeedItem = serde_json::from_value(serde_json::json!({
            "pk": 99_i64,
            "code": "Cvid",
            "taken_at": 1_748_790_000_i64,
            "caption": null,
            "media_type": 2,
            "video_versions": [{"url": "https://cdn.example/v.mp4"}],
            "image_versions2": {"candidates": [{"url": "https://cdn.example/poster.jpg"}]}
        }))
        .expect("deserialize");

        let post = item.into_post().expect("convert");
        assert_eq!(post.media_kind, MediaKind::Video);
        assert_eq!(post.media_url.as_deref(), Some("https://cdn.example/v.mp4"));
        assert!(post.caption.is_none());
    }

    #[test]
    fn feed_item_without_media_urls_converts_with_none() {
        let item: WireFeedItem = serde_json::from_value(serde_json::json!({
            "pk": 7_i64,
            "code": "Cbare",
            "taken_at": 1_748_790_000_i64,
            "media_type": 1
        }))
        .expect("deserialize");

        let post = item.into_post().expect("convert");
        assert!(post.media_url.is_none());
    }

    #[test]
    fn comment_converts_with_missing_timestamp() {
        let comment: WireComment = serde_json::from_value(serde_json::json!({
            "pk": 555_i64,
            "user": {"username": "reader"},
            "text": "nice shot",
            "created_at": null
        }))
        .expect("deserialize");

        let converted = comment.into_comment();
        assert_eq!(converted.comment_id, "555");
        assert_eq!(converted.author_username, "reader");
        assert!(converted.posted_at.is_none());
        assert_eq!(converted.like_count, 0);
    }

    #[test]
    fn story_item_converts() {
        let item: WireStoryItem = serde_json::from_value(serde_json::json!({
            "pk": 808_i64,
            "taken_at": 1_748_790_000_i64,
            "media_type": 2,
            "video_versions": [{"url": "https://cdn.example/s.mp4"}]
        }))
        .expect("deserialize");

        let story = item.into_story().expect("convert");
        assert_eq!(story.story_id, "808");
        assert_eq!(story.media_kind, MediaKind::Video);
    }
}
