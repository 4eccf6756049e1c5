//! Membership and opt-out store.
//!
//! Membership rows grant access to private channels; opt-out rows hide a
//! channel from a user's listing without touching membership. Joining is
//! internal to invite acceptance, so the only public mutation here is
//! leaving.

use crate::db::DbError;
use sqlx::SqlitePool;

/// Repository for membership and opt-out operations.
pub struct MemberRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MemberRepository<'a> {
    /// Create a new membership repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Leave a channel: delete any membership row and upsert an opt-out row,
    /// atomically. Returns whether a membership row was actually removed.
    ///
    /// For public channels the opt-out is purely a visibility filter; for
    /// private channels the membership deletion also revokes access. The
    /// caller enforces that owners delete their channel instead of leaving.
    pub async fn leave(&self, channel_id: i64, username: &str) -> Result<bool, DbError> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM channel_members
            WHERE channel_id = ? AND username = ?
            "#,
        )
        .bind(channel_id)
        .bind(username)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO channel_opt_outs (channel_id, username, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(channel_id)
        .bind(username)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(removed.rows_affected() > 0)
    }

    /// Check for a membership row, comparing the username exactly.
    pub async fn is_member(&self, channel_id: i64, username: &str) -> Result<bool, DbError> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT 1 FROM channel_members
            WHERE channel_id = ? AND username = ?
            "#,
        )
        .bind(channel_id)
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Check for an `owner`-role membership row, comparing the username
    /// exactly. Channel deletion falls back to this for legacy rows that
    /// predate the `owner_name` column.
    pub async fn is_owner_member(&self, channel_id: i64, username: &str) -> Result<bool, DbError> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT 1 FROM channel_members
            WHERE channel_id = ? AND username = ? AND role = 'owner'
            "#,
        )
        .bind(channel_id)
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Check for an opt-out row, comparing the username exactly.
    pub async fn has_opt_out(&self, channel_id: i64, username: &str) -> Result<bool, DbError> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT 1 FROM channel_opt_outs
            WHERE channel_id = ? AND username = ?
            "#,
        )
        .bind(channel_id)
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }
}
