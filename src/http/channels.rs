//! Channel directory routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{AppState, UserQuery};
use crate::db::{is_default_channel, Channel};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub(crate) struct CreateChannelRequest {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub owner_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetPrivacyRequest {
    pub is_private: bool,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LeaveRequest {
    #[serde(default)]
    pub username: String,
}

/// `GET /api/forum/channels?username=` - visible channels with live counts.
pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    let channels = state.db.channels().list_visible(&q.username).await?;
    Ok(Json(channels))
}

/// `POST /api/forum/channels` - create a channel.
pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateChannelRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidName("channel name is required".to_string()));
    }
    let max = state.config.channels.name_max_len;
    if name.chars().count() > max {
        return Err(ApiError::InvalidName(format!(
            "channel name must be at most {max} characters"
        )));
    }

    let channel = state
        .db
        .channels()
        .create(
            name,
            req.icon.as_deref(),
            req.description.as_deref(),
            req.is_private,
            req.owner_name.as_deref().filter(|o| !o.is_empty()),
            state.config.channels.case_insensitive_names,
        )
        .await?;

    crate::metrics::record_channel_created();
    info!(channel = %channel.name, private = channel.is_private, "channel created");

    Ok((StatusCode::CREATED, Json(channel)))
}

/// `DELETE /api/forum/channels/:id?username=` - delete a channel and
/// everything under it.
pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<i64>,
    Query(q): Query<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    if q.username.is_empty() {
        return Err(ApiError::AuthRequired);
    }

    let channel = fetch_channel(&state, channel_id).await?;

    if is_default_channel(&channel.name) {
        return Err(ApiError::ProtectedChannel);
    }

    // Owner of record wins; channels created before ownership was recorded
    // fall back to an owner-role membership check.
    let allowed = match channel.owner_name {
        Some(_) => channel.is_owned_by(&q.username),
        None => {
            state
                .db
                .members()
                .is_owner_member(channel_id, &q.username)
                .await?
        }
    };
    if !allowed {
        return Err(ApiError::Forbidden(
            "only the channel owner can delete this channel".to_string(),
        ));
    }

    state.db.channels().delete(channel_id).await?;
    info!(channel = %channel.name, by = %q.username, "channel deleted");

    Ok(Json(serde_json::json!({
        "message": format!("channel '{}' deleted", channel.name)
    })))
}

/// `PUT /api/forum/channels/:id/privacy` - flip the privacy flag.
pub(crate) async fn set_privacy(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<i64>,
    Json(req): Json<SetPrivacyRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username.is_empty() {
        return Err(ApiError::AuthRequired);
    }

    let channel = fetch_channel(&state, channel_id).await?;

    if !channel.is_owned_by(&req.username) {
        return Err(ApiError::Forbidden(
            "only the channel owner can change privacy".to_string(),
        ));
    }

    state
        .db
        .channels()
        .set_privacy(channel_id, req.is_private)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "privacy updated",
        "is_private": req.is_private,
    })))
}

/// `POST /api/forum/channels/:id/leave` - leave a channel.
///
/// Owners cannot leave their own channel; they delete it instead, so a
/// private channel never ends up ownerless but extant.
pub(crate) async fn leave(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<i64>,
    Json(req): Json<LeaveRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username.is_empty() {
        return Err(ApiError::AuthRequired);
    }

    let channel = fetch_channel(&state, channel_id).await?;

    if channel.is_owned_by(&req.username) {
        return Err(ApiError::Forbidden(
            "owners cannot leave their own channel; delete it instead".to_string(),
        ));
    }

    state.db.members().leave(channel_id, &req.username).await?;
    info!(channel = %channel.name, user = %req.username, "user left channel");

    Ok(Json(serde_json::json!({
        "message": format!("left channel '{}'", channel.name)
    })))
}

/// `GET /api/forum/channels/:id/members` - member list, oldest join first.
pub(crate) async fn members(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    fetch_channel(&state, channel_id).await?;
    let members = state.db.channels().members(channel_id).await?;
    Ok(Json(members))
}

pub(crate) async fn fetch_channel(state: &AppState, channel_id: i64) -> ApiResult<Channel> {
    state
        .db
        .channels()
        .find_by_id(channel_id)
        .await?
        .ok_or(ApiError::ChannelNotFound)
}
