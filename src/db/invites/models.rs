//! Invite workflow models.

use serde::Serialize;

/// Invite lifecycle states.
///
/// `pending_owner → pending_recipient → accepted | declined`, plus
/// `pending_owner → declined` when the owner rejects outright. `accepted`
/// and `declined` are terminal; terminal rows are kept as an audit trail
/// and only disappear with their channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    PendingOwner,
    PendingRecipient,
    Accepted,
    Declined,
}

impl InviteStatus {
    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingOwner => "pending_owner",
            Self::PendingRecipient => "pending_recipient",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_owner" => Some(Self::PendingOwner),
            "pending_recipient" => Some(Self::PendingRecipient),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }

    /// True for states that permit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Declined)
    }
}

/// A channel invite row.
#[derive(Debug, Clone)]
pub struct Invite {
    pub id: i64,
    pub channel_id: i64,
    pub invited_by: String,
    pub invitee_username: String,
    pub invite_token: String,
    pub requires_owner_approval: bool,
    pub status: InviteStatus,
    pub created_at: i64,
    pub approved_by: Option<String>,
    pub approved_at: Option<i64>,
    pub responded_at: Option<i64>,
}

/// Outcome of an invite creation attempt.
#[derive(Debug)]
pub enum InviteOutcome {
    /// A fresh invite row was written.
    Created(Invite),
    /// The invitee already belongs to the channel; nothing was written.
    AlreadyMember,
}

/// A pending invite joined with its channel, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct PendingInvite {
    pub id: i64,
    pub channel_id: i64,
    pub channel_name: String,
    pub is_private: bool,
    pub invited_by: String,
    pub invitee_username: String,
    pub requires_owner_approval: bool,
    pub created_at: i64,
}
