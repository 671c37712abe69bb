//! Persistence for collected content snapshots (posts, comments, stories).
//!
//! Everything lands with `nlp_status = 'pending'` for the downstream
//! analysis stage, and a re-scan never resets a record that stage has
//! already consumed.

use gramscan_core::{CollectedComment, CollectedPost, CollectedStory};
use sqlx::PgPool;

use crate::DbError;

/// Inserts or refreshes a post snapshot keyed by `shortcode`.
///
/// A conflicting re-scan updates the engagement counters, caption, and
/// `collected_at`, keeps the first non-null `media_ref` (media is immutable
/// at the provider), and leaves `nlp_status` untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_post(pool: &PgPool, post: &CollectedPost) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO posts \
             (shortcode, media_id, owner_username, caption, posted_at, \
              like_count, comment_count, media_kind, media_ref) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (shortcode) DO UPDATE SET \
             caption       = EXCLUDED.caption, \
             like_count    = EXCLUDED.like_count, \
             comment_count = EXCLUDED.comment_count, \
             media_ref     = COALESCE(posts.media_ref, EXCLUDED.media_ref), \
             collected_at  = NOW()",
    )
    .bind(&post.shortcode)
    .bind(&post.media_id)
    .bind(&post.owner_username)
    .bind(&post.caption)
    .bind(post.posted_at)
    .bind(post.like_count)
    .bind(post.comment_count)
    .bind(post.media_kind.as_str())
    .bind(&post.media_ref)
    .execute(pool)
    .await?;

    Ok(())
}

/// Inserts a comment snapshot as a child of its post.
///
/// Comments are immutable snapshots; a duplicate `(post_shortcode,
/// comment_id)` is silently ignored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a missing
/// parent post).
pub async fn insert_comment(pool: &PgPool, comment: &CollectedComment) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO post_comments \
             (post_shortcode, comment_id, author_username, text, posted_at, like_count) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (post_shortcode, comment_id) DO NOTHING",
    )
    .bind(&comment.post_shortcode)
    .bind(&comment.comment_id)
    .bind(&comment.author_username)
    .bind(&comment.text)
    .bind(comment.posted_at)
    .bind(comment.like_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// Inserts or refreshes a story snapshot keyed by `story_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_story(pool: &PgPool, story: &CollectedStory) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO stories \
             (story_id, owner_username, captured_at, expires_at, media_kind, media_ref) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (story_id) DO UPDATE SET \
             media_ref    = COALESCE(stories.media_ref, EXCLUDED.media_ref), \
             collected_at = NOW()",
    )
    .bind(&story.story_id)
    .bind(&story.owner_username)
    .bind(story.captured_at)
    .bind(story.expires_at)
    .bind(story.media_kind.as_str())
    .bind(&story.media_ref)
    .execute(pool)
    .await?;

    Ok(())
}
