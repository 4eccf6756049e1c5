//! HTTP surface: axum routers and request/response types.
//!
//! All forum routes live under `/api`; Prometheus metrics are served on the
//! same listener at `/metrics`. Identity is an already-resolved username
//! string supplied by the (out-of-scope) session collaborator, accepted
//! from query strings and request bodies.

mod channels;
mod invites;
mod notifications;
mod posts;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::moderation::ContentFilter;

/// Shared state for all request handlers.
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub filter: ContentFilter,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let filter = ContentFilter::new(&config.moderation.banned_words);
        Self { db, config, filter }
    }
}

/// Username passed in a query string. Absent means anonymous.
#[derive(Debug, Deserialize)]
pub(crate) struct UserQuery {
    #[serde(default)]
    pub username: String,
}

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route(
            "/api/forum/channels",
            get(channels::list).post(channels::create),
        )
        .route("/api/forum/channels/:id", axum::routing::delete(channels::delete))
        .route("/api/forum/channels/:id/privacy", put(channels::set_privacy))
        .route("/api/forum/channels/:id/leave", post(channels::leave))
        .route("/api/forum/channels/:id/members", get(channels::members))
        .route("/api/forum/channels/:id/invite", post(invites::create))
        .route("/api/forum/invites", get(invites::pending_for_user))
        .route("/api/forum/invites/approvals", get(invites::pending_approvals))
        .route("/api/forum/invites/:id/approve", post(invites::approve))
        .route("/api/forum/invites/:id/respond", post(invites::respond))
        .route("/api/forum/channels/:id/posts", get(posts::list))
        .route("/api/forum/posts", post(posts::create))
        .route("/api/notifications", get(notifications::summary))
        .route("/api/notifications/read", post(notifications::mark_read))
        .with_state(state)
}

async fn health(State(_state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "nestboard",
    }))
}

async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}
