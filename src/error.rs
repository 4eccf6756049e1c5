//! Unified error handling for nestboard.
//!
//! Every failable operation funnels into [`ApiError`], which carries a
//! machine-readable code for clients and metrics plus an HTTP status.
//! Storage failures collapse to a generic 500 with details kept server-side.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::db::DbError;

// ============================================================================
// API Errors (request processing)
// ============================================================================

/// Errors that can occur while handling an API request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidName(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("content contains blocked language")]
    BannedContent,

    #[error("username is required")]
    AuthRequired,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotAuthorized(String),

    #[error("default channels cannot be deleted")]
    ProtectedChannel,

    #[error("channel not found")]
    ChannelNotFound,

    #[error("invite not found")]
    InviteNotFound,

    #[error("a channel named '{0}' already exists")]
    DuplicateName(String),

    #[error("you cannot invite yourself")]
    SelfInvite,

    #[error("{0}")]
    InvitePending(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("this invite is still awaiting owner approval")]
    NotApproved,

    #[error("internal error")]
    Internal(DbError),
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ChannelNotFound => ApiError::ChannelNotFound,
            DbError::ChannelExists(name) => ApiError::DuplicateName(name),
            DbError::NotMember => ApiError::NotAuthorized(
                "you must be the channel owner or a member to send invites".to_string(),
            ),
            DbError::SelfInvite => ApiError::SelfInvite,
            DbError::InviteActive(msg) => ApiError::InvitePending(msg),
            DbError::InviteNotFound => ApiError::InviteNotFound,
            DbError::InviteState(state) => ApiError::InvalidState(format!("invite is {state}")),
            DbError::InviteNotApproved => ApiError::NotApproved,
            DbError::NotRecipient => {
                ApiError::Forbidden("this invite is not addressed to you".to_string())
            }
            DbError::NotOwner => {
                ApiError::Forbidden("only the channel owner can do this".to_string())
            }
            other => ApiError::Internal(other),
        }
    }
}

impl ApiError {
    /// Get a static error code string for clients and metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidName(_) => "invalid_name",
            Self::InvalidInput(_) => "invalid_input",
            Self::BannedContent => "banned_content",
            Self::AuthRequired => "auth_required",
            Self::Forbidden(_) => "forbidden",
            Self::NotAuthorized(_) => "not_authorized",
            Self::ProtectedChannel => "protected_channel",
            Self::ChannelNotFound => "channel_not_found",
            Self::InviteNotFound => "invite_not_found",
            Self::DuplicateName(_) => "duplicate_name",
            Self::SelfInvite => "self_invite",
            Self::InvitePending(_) => "invite_pending",
            Self::InvalidState(_) => "invalid_state",
            Self::NotApproved => "not_approved",
            Self::Internal(_) => "internal",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidName(_) | Self::InvalidInput(_) | Self::BannedContent => {
                StatusCode::BAD_REQUEST
            }
            Self::AuthRequired => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::NotAuthorized(_) | Self::ProtectedChannel => {
                StatusCode::FORBIDDEN
            }
            Self::ChannelNotFound | Self::InviteNotFound => StatusCode::NOT_FOUND,
            Self::DuplicateName(_)
            | Self::SelfInvite
            | Self::InvitePending(_)
            | Self::InvalidState(_)
            | Self::NotApproved => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = self.status();
        let message = match self {
            // Never leak storage details to clients.
            Self::Internal(ref e) => {
                error!(error = %e, "internal error handling request");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        crate::metrics::record_api_error(code);
        (status, Json(serde_json::json!({ "error": message, "code": code }))).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
