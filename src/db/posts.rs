//! Post storage.
//!
//! Append-only: posts are created and listed, never edited. Deletion only
//! happens through channel cascade.

use crate::db::DbError;
use serde::Serialize;
use sqlx::SqlitePool;

/// A forum post row.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub channel_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: i64,
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    /// Create a new post repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a post. Access and content checks belong to the caller.
    pub async fn create(
        &self,
        channel_id: i64,
        author_name: &str,
        content: &str,
    ) -> Result<Post, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO posts (channel_id, author_name, content, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(channel_id)
        .bind(author_name)
        .bind(content)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(Post {
            id: result.last_insert_rowid(),
            channel_id,
            author_name: author_name.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Posts in a channel, oldest first.
    pub async fn list_for_channel(&self, channel_id: i64) -> Result<Vec<Post>, DbError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, String, i64)>(
            r#"
            SELECT id, channel_id, author_name, content, created_at
            FROM posts
            WHERE channel_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(channel_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, channel_id, author_name, content, created_at)| Post {
                id,
                channel_id,
                author_name,
                content,
                created_at,
            })
            .collect())
    }
}
