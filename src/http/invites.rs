//! Invite workflow routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{AppState, UserQuery};
use crate::db::{InviteOutcome, InviteStatus};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub(crate) struct CreateInviteRequest {
    #[serde(default)]
    pub invited_by: String,
    #[serde(default)]
    pub invitee_username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    #[serde(default)]
    pub username: String,
    pub action: String,
}

/// `POST /api/forum/channels/:id/invite` - invite a user into a channel.
///
/// The response message tells the caller where the invite landed: awaiting
/// owner review, awaiting the invitee, or a no-op because the invitee is
/// already a member.
pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<i64>,
    Json(req): Json<CreateInviteRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.invited_by.is_empty() {
        return Err(ApiError::AuthRequired);
    }
    if req.invitee_username.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "invitee_username is required".to_string(),
        ));
    }

    let outcome = state
        .db
        .invites()
        .create(channel_id, &req.invited_by, req.invitee_username.trim())
        .await?;

    match outcome {
        InviteOutcome::AlreadyMember => Ok((
            StatusCode::OK,
            Json(serde_json::json!({
                "message": format!("{} is already a member", req.invitee_username.trim()),
                "already_member": true,
            })),
        )),
        InviteOutcome::Created(invite) => {
            crate::metrics::record_invite_created();
            info!(
                channel_id,
                invitee = %invite.invitee_username,
                status = invite.status.as_str(),
                "invite created"
            );
            let message = match invite.status {
                InviteStatus::PendingOwner => {
                    format!(
                        "invite for {} sent to the channel owner for approval",
                        invite.invitee_username
                    )
                }
                _ => format!("invite sent to {}", invite.invitee_username),
            };
            Ok((
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "message": message,
                    "invite_id": invite.id,
                    "status": invite.status,
                    "requires_owner_approval": invite.requires_owner_approval,
                })),
            ))
        }
    }
}

/// `GET /api/forum/invites?username=` - invites awaiting this user's answer.
pub(crate) async fn pending_for_user(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    if q.username.is_empty() {
        return Err(ApiError::AuthRequired);
    }
    let invites = state.db.invites().pending_for_invitee(&q.username).await?;
    Ok(Json(invites))
}

/// `GET /api/forum/invites/approvals?username=` - invites awaiting review in
/// channels this user owns.
pub(crate) async fn pending_approvals(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    if q.username.is_empty() {
        return Err(ApiError::AuthRequired);
    }
    let invites = state
        .db
        .invites()
        .pending_approvals_for_owner(&q.username)
        .await?;
    Ok(Json(invites))
}

/// `POST /api/forum/invites/:id/approve` - owner review of a pending invite.
pub(crate) async fn approve(
    State(state): State<Arc<AppState>>,
    Path(invite_id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username.is_empty() {
        return Err(ApiError::AuthRequired);
    }
    let approve = match req.action.as_str() {
        "approve" => true,
        "decline" => false,
        other => {
            return Err(ApiError::InvalidInput(format!(
                "action must be 'approve' or 'decline', got '{other}'"
            )));
        }
    };

    state
        .db
        .invites()
        .review(invite_id, &req.username, approve)
        .await?;

    let (action, message) = if approve {
        ("approved", "invite approved and sent to the invitee")
    } else {
        ("declined", "invite declined")
    };
    crate::metrics::record_invite_resolved(action);
    info!(invite_id, action, by = %req.username, "invite reviewed");

    Ok(Json(serde_json::json!({ "message": message })))
}

/// `POST /api/forum/invites/:id/respond` - invitee answer to an invite.
pub(crate) async fn respond(
    State(state): State<Arc<AppState>>,
    Path(invite_id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username.is_empty() {
        return Err(ApiError::AuthRequired);
    }
    let accept = match req.action.as_str() {
        "accept" => true,
        "decline" => false,
        other => {
            return Err(ApiError::InvalidInput(format!(
                "action must be 'accept' or 'decline', got '{other}'"
            )));
        }
    };

    state
        .db
        .invites()
        .respond(invite_id, &req.username, accept)
        .await?;

    let (action, message) = if accept {
        ("accepted", "invite accepted, you are now a member")
    } else {
        ("declined", "invite declined")
    };
    crate::metrics::record_invite_resolved(action);
    info!(invite_id, action, by = %req.username, "invite answered");

    Ok(Json(serde_json::json!({ "message": message })))
}
