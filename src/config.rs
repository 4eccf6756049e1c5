//! Configuration loading and management.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP listener configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Channel directory configuration.
    #[serde(default)]
    pub channels: ChannelsConfig,
    /// Post configuration.
    #[serde(default)]
    pub posts: PostsConfig,
    /// Content moderation configuration.
    #[serde(default)]
    pub moderation: ModerationConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (default: 127.0.0.1:5001).
    /// Metrics are served on the same listener at `/metrics`.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> SocketAddr {
    ([127, 0, 0, 1], 5001).into()
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file (default: nestboard.db).
    #[serde(default = "default_db_path")]
    pub path: String,
    /// How long a writer waits on a locked database before giving up,
    /// in milliseconds (default: 5000).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_db_path() -> String {
    "nestboard.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Channel directory configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelsConfig {
    /// Treat channel names as case-insensitive for duplicate detection
    /// (default: false, names compare exactly).
    #[serde(default)]
    pub case_insensitive_names: bool,
    /// Maximum channel name length in characters (default: 80).
    #[serde(default = "default_name_max_len")]
    pub name_max_len: usize,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            case_insensitive_names: false,
            name_max_len: default_name_max_len(),
        }
    }
}

fn default_name_max_len() -> usize {
    80
}

/// Post configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PostsConfig {
    /// Maximum post body length in characters (default: 10000).
    #[serde(default = "default_post_max_len")]
    pub max_len: usize,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            max_len: default_post_max_len(),
        }
    }
}

fn default_post_max_len() -> usize {
    10000
}

/// Content moderation configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ModerationConfig {
    /// Additional banned words, appended to the built-in list.
    #[serde(default)]
    pub banned_words: Vec<String>,
}
