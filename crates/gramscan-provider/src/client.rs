//! HTTP client for the content provider's private API.
//!
//! [`InstagramClient`] turns a credential's session material into an
//! authenticated [`InstagramSession`]; the session exposes the probe,
//! profile resolution, pagination, and media download surface the crawl
//! engine consumes. Every failure mode maps onto the shared
//! [`ProviderError`] taxonomy. Notably there is no in-place retry here: a
//! 429 must surface so the scan core can abort the run with a cooldown.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use gramscan_core::ports::{ContentProvider, ProviderSession};
use gramscan_core::{
    Page, ProfileHandle, ProviderComment, ProviderError, ProviderPost, ProviderStory,
};

use crate::types::{
    CommentsResponse, FeedResponse, ReelResponse, SessionMaterial, StatusEnvelope,
    WebProfileResponse,
};

/// Page size requested from the feed endpoints.
const FEED_PAGE_SIZE: u32 = 12;

/// Factory for authenticated provider sessions.
pub struct InstagramClient {
    base_url: String,
    timeout_secs: u64,
    media_timeout_secs: u64,
    user_agent: String,
}

impl InstagramClient {
    /// Creates a client factory.
    ///
    /// `base_url` is the API origin (overridable so tests can point at a
    /// local mock server). `timeout_secs` bounds API requests;
    /// `media_timeout_secs` bounds media downloads, which are larger.
    #[must_use]
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        media_timeout_secs: u64,
        user_agent: &str,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            media_timeout_secs,
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl ContentProvider for InstagramClient {
    async fn open_session(
        &self,
        account: &str,
        material: &[u8],
    ) -> Result<Box<dyn ProviderSession>, ProviderError> {
        let material = SessionMaterial::parse(material)?;

        let mut headers = HeaderMap::new();
        let cookie = HeaderValue::from_str(&material.cookie_header()).map_err(|e| {
            ProviderError::SessionMaterial {
                reason: format!("cookie header: {e}"),
            }
        })?;
        headers.insert(COOKIE, cookie);
        let csrf = HeaderValue::from_str(&material.csrftoken).map_err(|e| {
            ProviderError::SessionMaterial {
                reason: format!("csrf header: {e}"),
            }
        })?;
        headers.insert("x-csrftoken", csrf);

        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&self.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Transport {
                context: "building http client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(InstagramSession {
            client,
            base_url: self.base_url.clone(),
            media_timeout_secs: self.media_timeout_secs,
            account: account.to_string(),
        }))
    }
}

/// One credential's authenticated view of the provider API.
pub struct InstagramSession {
    client: Client,
    base_url: String,
    media_timeout_secs: u64,
    account: String,
}

impl InstagramSession {
    /// Shared GET-and-decode path. Maps 429 (with `Retry-After`) to
    /// `RateLimited`, 401/403 to `LoginRequired`, any other non-2xx to
    /// `UnexpectedStatus`, and body-shape mismatches to `Deserialize`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        context: &str,
    ) -> Result<T, ProviderError> {
        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|e| ProviderError::Transport {
                    context: context.to_string(),
                    reason: e.to_string(),
                })?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::LoginRequired {
                account: self.account.clone(),
            });
        }

        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport {
                context: context.to_string(),
                reason: e.to_string(),
            })?;
        serde_json::from_str::<T>(&body).map_err(|e| ProviderError::Deserialize {
            context: context.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Rewrites a 404 into `ProfileNotFound` for endpoints whose URL is keyed by
/// a profile; a vanished profile is a skippable condition, not a fault.
fn map_profile_not_found(err: ProviderError, username: &str) -> ProviderError {
    match err {
        ProviderError::UnexpectedStatus { status: 404, .. } => ProviderError::ProfileNotFound {
            username: username.to_string(),
        },
        other => other,
    }
}

#[async_trait]
impl ProviderSession for InstagramSession {
    async fn verify(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/v1/accounts/current_user/", self.base_url);
        self.get_json::<StatusEnvelope>(url, "current user probe")
            .await?;
        Ok(())
    }

    async fn resolve_profile(&self, username: &str) -> Result<ProfileHandle, ProviderError> {
        let url = format!(
            "{}/api/v1/users/web_profile_info/?username={username}",
            self.base_url
        );
        let response = self
            .get_json::<WebProfileResponse>(url, "profile resolution")
            .await
            .map_err(|e| map_profile_not_found(e, username))?;

        let Some(user) = response.data.user else {
            return Err(ProviderError::ProfileNotFound {
                username: username.to_string(),
            });
        };

        if user.is_private && !user.followed_by_viewer {
            return Err(ProviderError::ProfileInaccessible {
                username: username.to_string(),
            });
        }

        Ok(ProfileHandle {
            user_id: user.id,
            username: user.username,
        })
    }

    async fn posts_page(
        &self,
        profile: &ProfileHandle,
        cursor: Option<&str>,
    ) -> Result<Page<ProviderPost>, ProviderError> {
        let mut url = format!(
            "{}/api/v1/feed/user/{}/?count={FEED_PAGE_SIZE}",
            self.base_url, profile.user_id
        );
        if let Some(cursor) = cursor {
            url.push_str(&format!("&max_id={cursor}"));
        }

        let response = self
            .get_json::<FeedResponse>(url, "post feed")
            .await
            .map_err(|e| map_profile_not_found(e, &profile.username))?;

        let next_cursor = if response.more_available {
            response.next_max_id
        } else {
            None
        };
        let items = response
            .items
            .into_iter()
            .map(crate::types::WireFeedItem::into_post)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { items, next_cursor })
    }

    async fn comments_page(
        &self,
        media_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<ProviderComment>, ProviderError> {
        let mut url = format!("{}/api/v1/media/{media_id}/comments/", self.base_url);
        if let Some(cursor) = cursor {
            url.push_str(&format!("?max_id={cursor}"));
        }

        let response = self
            .get_json::<CommentsResponse>(url, "comment thread")
            .await?;

        Ok(Page {
            items: response
                .comments
                .into_iter()
                .map(crate::types::WireComment::into_comment)
                .collect(),
            next_cursor: response.next_max_id,
        })
    }

    async fn stories(&self, profile: &ProfileHandle) -> Result<Vec<ProviderStory>, ProviderError> {
        let url = format!(
            "{}/api/v1/feed/user/{}/story/",
            self.base_url, profile.user_id
        );
        let response = self
            .get_json::<ReelResponse>(url, "story reel")
            .await
            .map_err(|e| map_profile_not_found(e, &profile.username))?;

        let Some(reel) = response.reel else {
            return Ok(Vec::new());
        };
        reel.items
            .into_iter()
            .map(crate::types::WireStoryItem::into_story)
            .collect()
    }

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.media_timeout_secs))
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                context: "media download".to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: None,
            });
        }
        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport {
                context: "media download".to_string(),
                reason: e.to_string(),
            })?;
        Ok(bytes.to_vec())
    }
}
