//! Post routes: listing and creation.
//!
//! Both paths consult the access gate; creation additionally runs the
//! banned-word filter and, after the post commits, fires the notification
//! fan-out.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::channels::fetch_channel;
use super::{AppState, UserQuery};
use crate::access::{self, Operation};
use crate::error::{ApiError, ApiResult};
use crate::moderation::FilterVerdict;

#[derive(Debug, Deserialize)]
pub(crate) struct CreatePostRequest {
    pub channel_id: i64,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub content: String,
}

/// `GET /api/forum/channels/:id/posts?username=` - posts, oldest first.
pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<i64>,
    Query(q): Query<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    let channel = fetch_channel(&state, channel_id).await?;
    access::check(&state.db, &channel, &q.username, Operation::Read).await?;

    let posts = state.db.posts().list_for_channel(channel_id).await?;
    Ok(Json(posts))
}

/// `POST /api/forum/posts` - create a post and fan out notifications.
///
/// The post commits in its own transaction; fan-out is best-effort
/// afterwards. A fan-out failure is logged and the post still stands.
pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.author_name.is_empty() {
        return Err(ApiError::AuthRequired);
    }
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::InvalidInput("post content is required".to_string()));
    }
    let max = state.config.posts.max_len;
    if content.chars().count() > max {
        return Err(ApiError::InvalidInput(format!(
            "post content must be at most {max} characters"
        )));
    }
    if let FilterVerdict::Blocked { pattern } = state.filter.check(content) {
        info!(author = %req.author_name, pattern = %pattern, "post blocked by content filter");
        return Err(ApiError::BannedContent);
    }

    let channel = fetch_channel(&state, req.channel_id).await?;
    access::check(&state.db, &channel, &req.author_name, Operation::Write).await?;

    let post = state
        .db
        .posts()
        .create(req.channel_id, &req.author_name, content)
        .await?;
    crate::metrics::record_post_created();

    match state.db.notifications().fan_out(&post).await {
        Ok(delivered) => crate::metrics::record_fanout(delivered),
        Err(e) => {
            warn!(post_id = post.id, error = %e, "notification fan-out failed");
        }
    }

    Ok((StatusCode::CREATED, Json(post)))
}
