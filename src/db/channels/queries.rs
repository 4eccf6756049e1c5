//! Channel repository for database queries.

use super::models::{Channel, ChannelMember, ChannelSummary};
use crate::db::DbError;
use sqlx::SqlitePool;

/// Repository for channel directory operations.
pub struct ChannelRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ChannelRepository<'a> {
    /// Create a new channel repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a channel.
    ///
    /// The duplicate probe compares names exactly unless
    /// `case_insensitive_names` is set, in which case it uses NOCASE; the
    /// UNIQUE constraint on `channels.name` backstops the exact case either
    /// way. When the channel is private and an owner is supplied, an
    /// `owner`-role membership is written in the same transaction.
    pub async fn create(
        &self,
        name: &str,
        icon: Option<&str>,
        description: Option<&str>,
        is_private: bool,
        owner_name: Option<&str>,
        case_insensitive_names: bool,
    ) -> Result<Channel, DbError> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        let probe = if case_insensitive_names {
            "SELECT id FROM channels WHERE name = ? COLLATE NOCASE"
        } else {
            "SELECT id FROM channels WHERE name = ?"
        };
        let existing = sqlx::query_as::<_, (i64,)>(probe)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(DbError::ChannelExists(name.to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO channels (name, icon, description, is_private, owner_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(icon)
        .bind(description)
        .bind(is_private)
        .bind(owner_name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // Convert UNIQUE constraint violation to ChannelExists error
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::ChannelExists(name.to_string());
            }
            DbError::from(e)
        })?;

        let channel_id = result.last_insert_rowid();

        if is_private && let Some(owner) = owner_name {
            sqlx::query(
                r#"
                INSERT INTO channel_members (channel_id, username, role, joined_at)
                VALUES (?, ?, 'owner', ?)
                "#,
            )
            .bind(channel_id)
            .bind(owner)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Channel {
            id: channel_id,
            name: name.to_string(),
            icon: icon.map(String::from),
            description: description.map(String::from),
            is_private,
            owner_name: owner_name.map(String::from),
            created_at: now,
        })
    }

    /// Find channel by id.
    pub async fn find_by_id(&self, channel_id: i64) -> Result<Option<Channel>, DbError> {
        let row = sqlx::query_as::<_, (i64, String, Option<String>, Option<String>, bool, Option<String>, i64)>(
            r#"
            SELECT id, name, icon, description, is_private, owner_name, created_at
            FROM channels
            WHERE id = ?
            "#,
        )
        .bind(channel_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(
            |(id, name, icon, description, is_private, owner_name, created_at)| Channel {
                id,
                name,
                icon,
                description,
                is_private,
                owner_name,
                created_at,
            },
        ))
    }

    /// List every channel visible to `username`, ordered by name.
    ///
    /// Visible means: public channels, plus private channels the user owns
    /// or belongs to, minus channels the user opted out of. An empty
    /// username matches no owner/membership/opt-out row and so yields the
    /// public set.
    pub async fn list_visible(&self, username: &str) -> Result<Vec<ChannelSummary>, DbError> {
        let rows = sqlx::query_as::<_, (i64, String, Option<String>, Option<String>, bool, Option<String>, i64, i64)>(
            r#"
            SELECT c.id, c.name, c.icon, c.description, c.is_private, c.owner_name,
                   (SELECT COUNT(*) FROM channel_members m WHERE m.channel_id = c.id) AS member_count,
                   (SELECT COUNT(*) FROM posts p WHERE p.channel_id = c.id) AS post_count
            FROM channels c
            WHERE (c.is_private = 0
                   OR c.owner_name = ?
                   OR EXISTS (SELECT 1 FROM channel_members m
                              WHERE m.channel_id = c.id AND m.username = ?))
              AND NOT EXISTS (SELECT 1 FROM channel_opt_outs o
                              WHERE o.channel_id = c.id AND o.username = ?)
            ORDER BY c.name ASC
            "#,
        )
        .bind(username)
        .bind(username)
        .bind(username)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, name, icon, description, is_private, owner_name, member_count, post_count)| {
                    ChannelSummary {
                        id,
                        name,
                        icon,
                        description,
                        is_private,
                        owner_name,
                        member_count,
                        post_count,
                    }
                },
            )
            .collect())
    }

    /// List members of a channel, oldest join first.
    pub async fn members(&self, channel_id: i64) -> Result<Vec<ChannelMember>, DbError> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>, i64)>(
            r#"
            SELECT username, role, invited_by, joined_at
            FROM channel_members
            WHERE channel_id = ?
            ORDER BY joined_at ASC, id ASC
            "#,
        )
        .bind(channel_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(username, role, invited_by, joined_at)| ChannelMember {
                username,
                role,
                invited_by,
                joined_at,
            })
            .collect())
    }

    /// Flip the privacy flag. Ownership checks belong to the caller.
    pub async fn set_privacy(&self, channel_id: i64, is_private: bool) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE channels SET is_private = ? WHERE id = ?")
            .bind(is_private)
            .bind(channel_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a channel.
    ///
    /// Memberships, opt-outs, invites, posts, and notifications are removed
    /// via CASCADE in the same statement's transaction.
    pub async fn delete(&self, channel_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(channel_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
