//! Post notification fan-out and read tracking.
//!
//! One notification row per (post, recipient), deduplicated by the unique
//! pair constraint. Fan-out runs after the post's own transaction has
//! committed and is best-effort per recipient: a failed insert is logged
//! and skipped, never unwinding the post.

use crate::db::{DbError, Post};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::warn;

/// Cap on rows returned by the unread feed; read tracking still covers
/// everything via `mark_read`.
const UNREAD_LIMIT: i64 = 50;

/// An unread notification joined with its post and channel.
#[derive(Debug, Clone, Serialize)]
pub struct UnreadNotification {
    /// The post id, kept as `id` to mirror the post listing shape.
    pub id: i64,
    pub channel_id: i64,
    pub channel_name: String,
    pub author_name: String,
    pub content: String,
    pub created_at: i64,
    pub notification_id: i64,
}

/// Which notifications a read request targets.
#[derive(Debug, Clone, Copy)]
pub enum ReadSelector<'a> {
    /// Every unread notification for the caller.
    All,
    /// Explicit notification ids.
    Notifications(&'a [i64]),
    /// Every notification the caller holds for these posts.
    Posts(&'a [i64]),
}

/// Repository for post notification operations.
pub struct NotificationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fan a committed post out to its recipient set.
    ///
    /// Recipients are the channel owner plus all members, minus the author,
    /// compared exactly as stored. Each insert is its own atomic statement
    /// with INSERT OR IGNORE on the (post, recipient) pair, so re-running
    /// fan-out for the same post is a no-op. Returns the number of rows
    /// actually written.
    pub async fn fan_out(&self, post: &Post) -> Result<usize, DbError> {
        let owner = sqlx::query_as::<_, (Option<String>,)>(
            "SELECT owner_name FROM channels WHERE id = ?",
        )
        .bind(post.channel_id)
        .fetch_optional(self.pool)
        .await?;

        let Some((owner_name,)) = owner else {
            // The channel disappeared between the post commit and fan-out;
            // the cascade already removed the post as well.
            return Ok(0);
        };

        let members: Vec<(String,)> = sqlx::query_as(
            "SELECT username FROM channel_members WHERE channel_id = ?",
        )
        .bind(post.channel_id)
        .fetch_all(self.pool)
        .await?;
        let members: Vec<String> = members.into_iter().map(|(u,)| u).collect();

        let recipients = recipient_set(owner_name.as_deref(), &members, &post.author_name);

        let now = chrono::Utc::now().timestamp();
        let mut delivered = 0usize;
        for recipient in &recipients {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO post_notifications
                    (channel_id, post_id, recipient_username, is_read, created_at)
                VALUES (?, ?, ?, 0, ?)
                "#,
            )
            .bind(post.channel_id)
            .bind(post.id)
            .bind(recipient)
            .bind(now)
            .execute(self.pool)
            .await;

            match result {
                Ok(r) => delivered += usize::from(r.rows_affected() > 0),
                Err(e) => {
                    warn!(
                        post_id = post.id,
                        recipient = %recipient,
                        error = %e,
                        "failed to write post notification, skipping recipient"
                    );
                }
            }
        }

        Ok(delivered)
    }

    /// Mark notifications read for `username`.
    ///
    /// Only rows transitioning unread to read are counted, so repeated
    /// calls return zero. An empty id selector is a no-op.
    pub async fn mark_read(
        &self,
        username: &str,
        selector: ReadSelector<'_>,
    ) -> Result<u64, DbError> {
        match selector {
            ReadSelector::Notifications(ids) if ids.is_empty() => return Ok(0),
            ReadSelector::Posts(ids) if ids.is_empty() => return Ok(0),
            _ => {}
        }

        let now = chrono::Utc::now().timestamp();

        let mut qb = sqlx::QueryBuilder::new("UPDATE post_notifications SET is_read = 1, read_at = ");
        qb.push_bind(now);
        qb.push(" WHERE recipient_username = ");
        qb.push_bind(username);
        qb.push(" AND is_read = 0");

        match selector {
            ReadSelector::All => {}
            ReadSelector::Notifications(ids) => {
                qb.push(" AND id IN (");
                let mut sep = qb.separated(", ");
                for id in ids {
                    sep.push_bind(*id);
                }
                qb.push(")");
            }
            ReadSelector::Posts(ids) => {
                qb.push(" AND post_id IN (");
                let mut sep = qb.separated(", ");
                for id in ids {
                    sep.push_bind(*id);
                }
                qb.push(")");
            }
        }

        let result = qb.build().execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Unread notifications for `username`, newest first, joined with their
    /// posts and channels.
    pub async fn unread_for(&self, username: &str) -> Result<Vec<UnreadNotification>, DbError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, String, String, i64, i64)>(
            r#"
            SELECT p.id, p.channel_id, c.name, p.author_name, p.content,
                   p.created_at, n.id
            FROM post_notifications n
            JOIN posts p ON p.id = n.post_id
            JOIN channels c ON c.id = p.channel_id
            WHERE n.recipient_username = ? AND n.is_read = 0
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT ?
            "#,
        )
        .bind(username)
        .bind(UNREAD_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, channel_id, channel_name, author_name, content, created_at, notification_id)| {
                    UnreadNotification {
                        id,
                        channel_id,
                        channel_name,
                        author_name,
                        content,
                        created_at,
                        notification_id,
                    }
                },
            )
            .collect())
    }

    /// Count of unread notifications for `username`.
    pub async fn unread_count(&self, username: &str) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM post_notifications
            WHERE recipient_username = ? AND is_read = 0
            "#,
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}

/// The interested-recipient set for a post: channel owner plus members,
/// minus the author. Set semantics, exact on stored spellings.
fn recipient_set(owner: Option<&str>, members: &[String], author: &str) -> BTreeSet<String> {
    let mut recipients: BTreeSet<String> = members.iter().cloned().collect();
    if let Some(owner) = owner {
        recipients.insert(owner.to_string());
    }
    recipients.remove(author);
    recipients
}
