//! Access gate for post reads and writes.
//!
//! The single authorization decision combining privacy, ownership,
//! membership, and the opt-out overlay. Both the post-listing and the
//! post-creation paths go through [`check`]; the decision does not vary by
//! operation.

use tracing::debug;

use crate::db::{Channel, Database};
use crate::error::{ApiError, ApiResult};

/// What the caller wants to do with the channel's posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Decide whether `viewer` may read or write posts in `channel`.
///
/// The caller has already resolved the channel, so absence is its problem;
/// this function answers only the authorization question:
/// 1. an opt-out row (exact username match) denies everything;
/// 2. public channels allow everyone;
/// 3. private channels allow the recorded owner (exact match) and members
///    (exact match), distinguishing "who are you" from "not yours".
pub async fn check(
    db: &Database,
    channel: &Channel,
    viewer: &str,
    op: Operation,
) -> ApiResult<()> {
    let has_opt_out = if viewer.is_empty() {
        false
    } else {
        db.members().has_opt_out(channel.id, viewer).await?
    };

    let is_member = if channel.is_private && !viewer.is_empty() {
        db.members().is_member(channel.id, viewer).await?
    } else {
        false
    };

    let decision = decide(channel, viewer, has_opt_out, is_member);
    if let Err(ref e) = decision {
        debug!(
            channel = %channel.name,
            viewer = %viewer,
            op = ?op,
            code = e.error_code(),
            "access denied"
        );
    }
    decision
}

/// The pure decision over pre-fetched facts.
fn decide(channel: &Channel, viewer: &str, has_opt_out: bool, is_member: bool) -> ApiResult<()> {
    if has_opt_out {
        return Err(ApiError::Forbidden(
            "you have left this channel".to_string(),
        ));
    }

    if !channel.is_private {
        return Ok(());
    }

    if channel.is_owned_by(viewer) || is_member {
        return Ok(());
    }

    if viewer.is_empty() {
        Err(ApiError::AuthRequired)
    } else {
        Err(ApiError::Forbidden("this channel is private".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(is_private: bool, owner: Option<&str>) -> Channel {
        Channel {
            id: 7,
            name: "sleep-vip".to_string(),
            icon: None,
            description: None,
            is_private,
            owner_name: owner.map(String::from),
            created_at: 0,
        }
    }

    #[test]
    fn test_public_allows_anyone() {
        let c = channel(false, None);
        assert!(decide(&c, "bob", false, false).is_ok());
        assert!(decide(&c, "", false, false).is_ok());
    }

    #[test]
    fn test_opt_out_denies_even_members() {
        let c = channel(false, None);
        let err = decide(&c, "bob", true, false).unwrap_err();
        assert_eq!(err.error_code(), "forbidden");

        let c = channel(true, Some("alice"));
        let err = decide(&c, "carol", true, true).unwrap_err();
        assert_eq!(err.error_code(), "forbidden");
    }

    #[test]
    fn test_private_owner_and_member_allowed() {
        let c = channel(true, Some("alice"));
        assert!(decide(&c, "alice", false, false).is_ok());
        assert!(decide(&c, "carol", false, true).is_ok());
    }

    #[test]
    fn test_private_owner_match_is_exact() {
        let c = channel(true, Some("Alice"));
        let err = decide(&c, "alice", false, false).unwrap_err();
        assert_eq!(err.error_code(), "forbidden");
    }

    #[test]
    fn test_private_anonymous_vs_stranger() {
        let c = channel(true, Some("alice"));
        let err = decide(&c, "", false, false).unwrap_err();
        assert_eq!(err.error_code(), "auth_required");

        let err = decide(&c, "mallory", false, false).unwrap_err();
        assert_eq!(err.error_code(), "forbidden");
    }
}
