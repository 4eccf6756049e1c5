//! Notification routes: the poll endpoint and read tracking.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::{AppState, UserQuery};
use crate::db::ReadSelector;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub(crate) struct MarkReadRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub mark_all: bool,
    #[serde(default)]
    pub notification_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub post_ids: Option<Vec<i64>>,
}

/// `GET /api/notifications?username=` - everything the client polls for:
/// unread post notifications, invites awaiting the user, and invites
/// awaiting the user's review as owner.
pub(crate) async fn summary(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    if q.username.is_empty() {
        return Err(ApiError::AuthRequired);
    }

    let new_posts = state.db.notifications().unread_for(&q.username).await?;
    let unread_count = state.db.notifications().unread_count(&q.username).await?;
    let channel_invites = state.db.invites().pending_for_invitee(&q.username).await?;
    let invite_approvals = state
        .db
        .invites()
        .pending_approvals_for_owner(&q.username)
        .await?;

    Ok(Json(serde_json::json!({
        "new_posts": new_posts,
        "channel_invites": channel_invites,
        "invite_approvals": invite_approvals,
        "unread_count": unread_count,
    })))
}

/// `POST /api/notifications/read` - mark notifications read.
///
/// Exactly one selector applies: `mark_all`, explicit notification ids, or
/// post ids. Returns the number of rows that actually flipped to read, so
/// a repeated call reports zero.
pub(crate) async fn mark_read(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarkReadRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username.is_empty() {
        return Err(ApiError::AuthRequired);
    }

    let marked = if req.mark_all {
        state
            .db
            .notifications()
            .mark_read(&req.username, ReadSelector::All)
            .await?
    } else if let Some(ref ids) = req.notification_ids {
        state
            .db
            .notifications()
            .mark_read(&req.username, ReadSelector::Notifications(ids))
            .await?
    } else if let Some(ref ids) = req.post_ids {
        state
            .db
            .notifications()
            .mark_read(&req.username, ReadSelector::Posts(ids))
            .await?
    } else {
        return Err(ApiError::InvalidInput(
            "one of mark_all, notification_ids, or post_ids is required".to_string(),
        ));
    };

    Ok(Json(serde_json::json!({ "marked": marked })))
}
