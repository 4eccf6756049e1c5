//! Database module for persistent storage.
//!
//! Provides async SQLite database access using SQLx for:
//! - The channel directory and its default seed set
//! - Channel memberships and the opt-out visibility overlay
//! - The invite state machine
//! - Posts and per-recipient post notifications

pub mod channels;
pub mod invites;
pub mod members;
pub mod notifications;
pub mod posts;

pub use channels::{Channel, ChannelMember, ChannelRepository, ChannelSummary};
pub use invites::{Invite, InviteOutcome, InviteRepository, InviteStatus, PendingInvite};
pub use members::MemberRepository;
pub use notifications::{NotificationRepository, ReadSelector, UnreadNotification};
pub use posts::{Post, PostRepository};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The permanent channel set seeded at startup. These names can never be
/// deleted through the API.
pub const DEFAULT_CHANNELS: &[(&str, &str, &str)] = &[
    ("general", "\u{1F4AC}", "General sleep training discussions"),
    ("night-wakings", "\u{1F319}", "Dealing with night wakings"),
    ("bedtime-routines", "\u{1F6CC}", "Bedtime routine ideas"),
    ("nap-schedules", "\u{1F634}", "Nap schedule discussions"),
    ("gentle-methods", "\u{1F4A4}", "Gentle sleep training methods"),
    ("support", "\u{1F499}", "Support and encouragement"),
];

/// True if `name` belongs to the permanent default set.
pub fn is_default_channel(name: &str) -> bool {
    DEFAULT_CHANNELS.iter().any(|(n, _, _)| *n == name)
}

/// Database errors.
///
/// Domain conditions detected inside repository transactions (duplicate
/// names, invite state violations) get their own variants so callers can
/// map them to precise API responses; everything else is a storage fault.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error: {0}")]
    Migration(sqlx::migrate::MigrateError),
    #[error("channel not found")]
    ChannelNotFound,
    #[error("channel already exists: {0}")]
    ChannelExists(String),
    #[error("inviter is neither owner nor member")]
    NotMember,
    #[error("inviter and invitee are the same user")]
    SelfInvite,
    #[error("{0}")]
    InviteActive(String),
    #[error("invite not found")]
    InviteNotFound,
    #[error("invite is {0}")]
    InviteState(String),
    #[error("invite awaiting owner approval")]
    InviteNotApproved,
    #[error("responder is not the invite recipient")]
    NotRecipient,
    #[error("requester is not the channel owner")]
    NotOwner,
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a new database connection, running migrations and seeding the
    /// default channel set if needed.
    ///
    /// `busy_timeout` is how long a writer blocks on a locked database
    /// before the call fails; concurrent writers retry inside SQLite rather
    /// than surfacing lock errors to handlers.
    pub async fn new(path: &str, busy_timeout: Duration) -> Result<Self, DbError> {
        let pool = if path == ":memory:" {
            // In-memory database - use proper SQLx in-memory mode
            // Use a uniquely named shared-cache memory database per call.
            // `file::memory:` is global-ish and will collide across parallel tests.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:nestboard-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true)
                .busy_timeout(busy_timeout);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        } else {
            // File-based database
            // Create parent directory if it doesn't exist
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .busy_timeout(busy_timeout);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Database connected");

        // Run embedded migrations
        Self::run_migrations(&pool).await?;

        // Enable WAL mode for better concurrency (reduces lock contention)
        // WAL mode allows reads to happen while writes are in progress
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        // Enable foreign key constraints (critical for ON DELETE CASCADE schema)
        sqlx::query("PRAGMA foreign_keys=ON").execute(&pool).await?;

        // Use NORMAL synchronous mode instead of FULL for better performance
        // NORMAL provides good durability while being faster than FULL
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        // Check database integrity on startup (prevents silent corruption from crashes)
        let integrity_result: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(&pool)
            .await?;

        if integrity_result != "ok" {
            tracing::error!(
                integrity_check = %integrity_result,
                "Database integrity check FAILED - corruption detected!"
            );
            return Err(DbError::Sqlx(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Database integrity check failed: {}", integrity_result),
            ))));
        }

        info!("Database integrity check passed");

        Self::seed_default_channels(&pool).await?;

        Ok(Self { pool })
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run embedded migrations.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(DbError::Migration)?;

        info!("Database migrations checked/applied");
        Ok(())
    }

    /// Insert the default channel set if absent. Idempotent across restarts.
    async fn seed_default_channels(pool: &SqlitePool) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        for (name, icon, description) in DEFAULT_CHANNELS {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO channels (name, icon, description, is_private, created_at)
                VALUES (?, ?, ?, 0, ?)
                "#,
            )
            .bind(name)
            .bind(icon)
            .bind(description)
            .bind(now)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    /// Get channel repository.
    pub fn channels(&self) -> ChannelRepository<'_> {
        ChannelRepository::new(&self.pool)
    }

    /// Get membership repository.
    pub fn members(&self) -> MemberRepository<'_> {
        MemberRepository::new(&self.pool)
    }

    /// Get invite repository.
    pub fn invites(&self) -> InviteRepository<'_> {
        InviteRepository::new(&self.pool)
    }

    /// Get post repository.
    pub fn posts(&self) -> PostRepository<'_> {
        PostRepository::new(&self.pool)
    }

    /// Get notification repository.
    pub fn notifications(&self) -> NotificationRepository<'_> {
        NotificationRepository::new(&self.pool)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channel_set() {
        assert_eq!(DEFAULT_CHANNELS.len(), 6);
        assert!(is_default_channel("general"));
        assert!(is_default_channel("support"));
        assert!(!is_default_channel("General"));
        assert!(!is_default_channel("sleep-vip"));
    }
}
