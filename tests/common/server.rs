//! Test server management.
//!
//! Builds the router on an in-memory database, serves it on an ephemeral
//! port, and exposes JSON request helpers plus a handle to the database for
//! direct repository assertions.

use nestboard::config::Config;
use nestboard::db::Database;
use nestboard::http::{self, AppState};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// An in-process application instance under test.
pub struct TestApp {
    addr: SocketAddr,
    pub db: Database,
    client: reqwest::Client,
}

impl TestApp {
    /// Spawn with default configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(Config::default()).await
    }

    /// Spawn with a specific configuration (the bind address is ignored;
    /// an ephemeral port is always used).
    pub async fn spawn_with(config: Config) -> anyhow::Result<Self> {
        let db = Database::new(":memory:", Duration::from_millis(5000)).await?;

        nestboard::metrics::init();

        let state = Arc::new(AppState::new(db.clone(), config));
        let app = http::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server error: {e}");
            }
        });

        Ok(Self {
            addr,
            db,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed");
        Self::split(resp).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("POST request failed");
        Self::split(resp).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("PUT request failed");
        Self::split(resp).await
    }

    pub async fn delete(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed");
        Self::split(resp).await
    }

    async fn split(resp: reqwest::Response) -> (u16, Value) {
        let status = resp.status().as_u16();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    // ------------------------------------------------------------------
    // Domain shortcuts used across test files
    // ------------------------------------------------------------------

    /// Create a channel and return its id.
    pub async fn create_channel(&self, name: &str, is_private: bool, owner: Option<&str>) -> i64 {
        let (status, body) = self
            .post(
                "/api/forum/channels",
                serde_json::json!({
                    "name": name,
                    "is_private": is_private,
                    "owner_name": owner,
                }),
            )
            .await;
        assert_eq!(status, 201, "channel creation failed: {body}");
        body["id"].as_i64().expect("channel id missing")
    }

    /// Create an invite and return its id.
    pub async fn invite(&self, channel_id: i64, by: &str, invitee: &str) -> i64 {
        let (status, body) = self
            .post(
                &format!("/api/forum/channels/{channel_id}/invite"),
                serde_json::json!({ "invited_by": by, "invitee_username": invitee }),
            )
            .await;
        assert_eq!(status, 201, "invite creation failed: {body}");
        body["invite_id"].as_i64().expect("invite id missing")
    }

    /// Accept an invite as `username`.
    pub async fn accept_invite(&self, invite_id: i64, username: &str) {
        let (status, body) = self
            .post(
                &format!("/api/forum/invites/{invite_id}/respond"),
                serde_json::json!({ "username": username, "action": "accept" }),
            )
            .await;
        assert_eq!(status, 200, "invite accept failed: {body}");
    }

    /// Create a post and return its id.
    pub async fn post_message(&self, channel_id: i64, author: &str, content: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/forum/posts",
                serde_json::json!({
                    "channel_id": channel_id,
                    "author_name": author,
                    "content": content,
                }),
            )
            .await;
        assert_eq!(status, 201, "post creation failed: {body}");
        body["id"].as_i64().expect("post id missing")
    }

    /// Unread notification count for a user.
    pub async fn unread_count(&self, username: &str) -> i64 {
        let (status, body) = self
            .get(&format!("/api/notifications?username={username}"))
            .await;
        assert_eq!(status, 200, "notifications poll failed: {body}");
        body["unread_count"].as_i64().expect("unread_count missing")
    }

    /// Names of channels visible to a user (empty string for anonymous).
    pub async fn visible_channels(&self, username: &str) -> Vec<String> {
        let (status, body) = self
            .get(&format!("/api/forum/channels?username={username}"))
            .await;
        assert_eq!(status, 200, "channel listing failed: {body}");
        body.as_array()
            .expect("channel list not an array")
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_string())
            .collect()
    }
}
