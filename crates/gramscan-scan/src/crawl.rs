//! The crawl engine: paginated enumeration of monitored targets, their
//! posts, comments, and stories, with pacing and per-item persistence.
//!
//! Per-item store failures degrade at the call site (the run continues);
//! provider failures go through [`classify`] at the target boundary. A rate
//! limit stops the whole run after one cooldown; anything unclassified is a
//! critical error surfaced to the orchestrator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use gramscan_core::ports::{ContentStore, MediaStore, ProviderSession, TargetRegistry};
use gramscan_core::{
    story_expiry, CollectedComment, CollectedPost, CollectedStory, MediaKind, MonitoredTarget,
    ProfileHandle, ProviderError, ProviderPost, ScanMetrics, StoreError, TargetKind,
};

use crate::classify::{classify, RecoveryAction};
use crate::pacing::PacingPolicy;

/// Upper bound on comments persisted per post. Full comment retrieval is
/// out of scope for a single run; page fetching stops at the cap.
pub const COMMENT_CAP: usize = 100;

/// Maximum pages per enumeration. Guards against cycling cursors.
const MAX_PAGES: usize = 200;

/// Outcome of a crawl that ran to a controlled stop.
#[derive(Debug)]
pub struct CrawlReport {
    pub metrics: ScanMetrics,
    /// True when the run was cut short by a provider rate limit.
    pub rate_limited: bool,
}

#[derive(Debug, Error)]
pub enum CrawlError {
    /// The target registry could not be read at all; nothing to crawl.
    #[error("failed to list monitored targets")]
    TargetListing(#[source] StoreError),

    /// An unclassified provider failure; aborts the run.
    #[error("unclassified provider failure while scanning {target}")]
    Critical {
        target: String,
        #[source]
        source: ProviderError,
    },
}

/// Deterministic blob-store path for one media item:
/// `{owner}/{YYYY-MM}/{item_id}.{ext}`.
#[must_use]
pub fn media_storage_path(
    owner: &str,
    taken_at: DateTime<Utc>,
    item_id: &str,
    kind: MediaKind,
) -> String {
    format!(
        "{owner}/{}/{item_id}.{}",
        taken_at.format("%Y-%m"),
        kind.extension()
    )
}

pub struct CrawlEngine {
    targets: Arc<dyn TargetRegistry>,
    content: Arc<dyn ContentStore>,
    media: Arc<dyn MediaStore>,
    pacing: PacingPolicy,
}

impl CrawlEngine {
    #[must_use]
    pub fn new(
        targets: Arc<dyn TargetRegistry>,
        content: Arc<dyn ContentStore>,
        media: Arc<dyn MediaStore>,
        pacing: PacingPolicy,
    ) -> Self {
        Self {
            targets,
            content,
            media,
            pacing,
        }
    }

    /// Crawls every active profile target under the given session.
    ///
    /// # Errors
    ///
    /// [`CrawlError::TargetListing`] when the profile list cannot be read,
    /// [`CrawlError::Critical`] for unclassified provider failures. A rate
    /// limit is not an error: it returns a report with `rate_limited = true`
    /// after the cooldown.
    pub async fn run(&self, session: &dyn ProviderSession) -> Result<CrawlReport, CrawlError> {
        match self.targets.list_active(TargetKind::Hashtag).await {
            Ok(hashtags) if !hashtags.is_empty() => {
                // Hashtag scanning is a deferred extension in this
                // generation; the registry rows exist but are not crawled.
                tracing::info!(
                    count = hashtags.len(),
                    "hashtag targets are not yet supported; skipping"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to list hashtag targets");
            }
        }

        let profiles = self
            .targets
            .list_active(TargetKind::Profile)
            .await
            .map_err(CrawlError::TargetListing)?;
        tracing::info!(count = profiles.len(), "starting profile crawl");

        let mut metrics = ScanMetrics::default();
        let mut first = true;
        for target in &profiles {
            if !first {
                self.pacing.between_targets.pause().await;
            }
            first = false;

            match self.scan_profile(session, target, &mut metrics).await {
                Ok(()) => {
                    metrics.targets_scanned += 1;
                    if let Err(e) = self
                        .targets
                        .stamp_scanned(TargetKind::Profile, &target.identifier)
                        .await
                    {
                        tracing::warn!(
                            target = %target.identifier,
                            error = %e,
                            "failed to stamp target scan time"
                        );
                    }
                }
                Err(err) => match classify(&err) {
                    RecoveryAction::SkipTarget => {
                        tracing::warn!(
                            target = %target.identifier,
                            error = %err,
                            "target skipped; left for the next run"
                        );
                        metrics.targets_skipped += 1;
                    }
                    RecoveryAction::CooldownAbort => {
                        tracing::warn!(
                            target = %target.identifier,
                            error = %err,
                            "provider rate limit; stopping run after cooldown"
                        );
                        self.pacing.rate_limit_cooldown.pause().await;
                        return Ok(CrawlReport {
                            metrics,
                            rate_limited: true,
                        });
                    }
                    RecoveryAction::Abort => {
                        return Err(CrawlError::Critical {
                            target: target.identifier.clone(),
                            source: err,
                        });
                    }
                },
            }
        }

        Ok(CrawlReport {
            metrics,
            rate_limited: false,
        })
    }

    /// Scans one profile target: resolution, posts (with comments), then
    /// stories. Any provider error bubbles to the caller for
    /// classification; partial progress stays counted in `metrics`.
    async fn scan_profile(
        &self,
        session: &dyn ProviderSession,
        target: &MonitoredTarget,
        metrics: &mut ScanMetrics,
    ) -> Result<(), ProviderError> {
        let profile = session.resolve_profile(&target.identifier).await?;
        tracing::info!(target = %profile.username, "profile resolved; enumerating posts");

        self.collect_posts(session, &profile, metrics).await?;
        self.collect_stories(session, &profile, metrics).await?;
        Ok(())
    }

    async fn collect_posts(
        &self,
        session: &dyn ProviderSession,
        profile: &ProfileHandle,
        metrics: &mut ScanMetrics,
    ) -> Result<(), ProviderError> {
        let mut cursor: Option<String> = None;
        let mut page_count = 0usize;

        loop {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(ProviderError::PaginationLimit {
                    context: format!("posts of {}", profile.username),
                    max_pages: MAX_PAGES,
                });
            }

            let page = session.posts_page(profile, cursor.as_deref()).await?;
            for post in page.items {
                self.collect_post(session, profile, &post, metrics).await?;
                self.pacing.per_post.pause().await;
            }

            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        Ok(())
    }

    /// Persists one post and up to [`COMMENT_CAP`] of its comments.
    async fn collect_post(
        &self,
        session: &dyn ProviderSession,
        profile: &ProfileHandle,
        post: &ProviderPost,
        metrics: &mut ScanMetrics,
    ) -> Result<(), ProviderError> {
        let destination =
            media_storage_path(&profile.username, post.taken_at, &post.shortcode, post.media_kind);
        let media_ref = self
            .store_media(session, post.media_url.as_deref(), &destination)
            .await?;

        let collected = CollectedPost {
            shortcode: post.shortcode.clone(),
            media_id: post.media_id.clone(),
            owner_username: profile.username.clone(),
            caption: post.caption.clone(),
            posted_at: post.taken_at,
            like_count: post.like_count,
            comment_count: post.comment_count,
            media_kind: post.media_kind,
            media_ref,
        };
        if let Err(e) = self.content.save_post(&collected).await {
            // Without the parent row the comment records would dangle.
            tracing::error!(
                shortcode = %post.shortcode,
                error = %e,
                "failed to persist post; skipping its comments"
            );
            return Ok(());
        }
        metrics.posts_collected += 1;

        self.collect_comments(session, post, metrics).await
    }

    async fn collect_comments(
        &self,
        session: &dyn ProviderSession,
        post: &ProviderPost,
        metrics: &mut ScanMetrics,
    ) -> Result<(), ProviderError> {
        let mut stored = 0usize;
        let mut cursor: Option<String> = None;
        let mut page_count = 0usize;

        while stored < COMMENT_CAP {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(ProviderError::PaginationLimit {
                    context: format!("comments of {}", post.shortcode),
                    max_pages: MAX_PAGES,
                });
            }

            let page = session.comments_page(&post.media_id, cursor.as_deref()).await?;
            if page.items.is_empty() && page.next_cursor.is_none() {
                break;
            }

            for comment in page.items.into_iter().take(COMMENT_CAP - stored) {
                let collected = CollectedComment {
                    post_shortcode: post.shortcode.clone(),
                    comment_id: comment.comment_id,
                    author_username: comment.author_username,
                    text: comment.text,
                    posted_at: comment.posted_at,
                    like_count: comment.like_count,
                };
                match self.content.save_comment(&collected).await {
                    Ok(()) => {
                        stored += 1;
                        metrics.comments_collected += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            shortcode = %post.shortcode,
                            error = %e,
                            "failed to persist comment"
                        );
                    }
                }
            }

            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        Ok(())
    }

    async fn collect_stories(
        &self,
        session: &dyn ProviderSession,
        profile: &ProfileHandle,
        metrics: &mut ScanMetrics,
    ) -> Result<(), ProviderError> {
        let stories = session.stories(profile).await?;

        for story in stories {
            let destination = media_storage_path(
                &profile.username,
                story.taken_at,
                &story.story_id,
                story.media_kind,
            );
            let media_ref = self
                .store_media(session, story.media_url.as_deref(), &destination)
                .await?;

            let collected = CollectedStory {
                story_id: story.story_id.clone(),
                owner_username: profile.username.clone(),
                captured_at: story.taken_at,
                expires_at: story_expiry(story.taken_at),
                media_kind: story.media_kind,
                media_ref,
            };
            match self.content.save_story(&collected).await {
                Ok(()) => metrics.stories_collected += 1,
                Err(e) => {
                    tracing::warn!(
                        story_id = %story.story_id,
                        error = %e,
                        "failed to persist story"
                    );
                }
            }

            self.pacing.per_story.pause().await;
        }

        Ok(())
    }

    /// Fetches and stores one media attachment.
    ///
    /// Partial-success policy: download and upload failures degrade to
    /// `None` so the parent record is still written with a null media
    /// reference. A rate limit is the exception: it must reach the
    /// classifier and stop the run.
    async fn store_media(
        &self,
        session: &dyn ProviderSession,
        url: Option<&str>,
        destination: &str,
    ) -> Result<Option<String>, ProviderError> {
        let Some(url) = url else {
            return Ok(None);
        };

        let bytes = match session.fetch_media(url).await {
            Ok(bytes) => bytes,
            Err(err @ ProviderError::RateLimited { .. }) => return Err(err),
            Err(err) => {
                tracing::warn!(url, error = %err, "media download failed; keeping null media reference");
                return Ok(None);
            }
        };

        match self.media.upload(bytes, destination).await {
            Ok(locator) => Ok(Some(locator)),
            Err(err) => {
                tracing::warn!(
                    destination,
                    error = %err,
                    "media upload failed; keeping null media reference"
                );
                Ok(None)
            }
        }
    }
}
