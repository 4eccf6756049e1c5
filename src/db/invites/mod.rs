//! Invite workflow.
//!
//! A multi-party state machine: inviter proposes, the channel owner reviews
//! when required, the invitee answers. Acceptance is the only path that
//! creates private-channel memberships.

pub mod models;
pub mod queries;

pub use models::{Invite, InviteOutcome, InviteStatus, PendingInvite};
pub use queries::InviteRepository;
