//! Channel directory.
//!
//! Handles channel creation, visibility-filtered listings, privacy, and
//! deletion with cascading cleanup.

pub mod models;
pub mod queries;

pub use models::{Channel, ChannelMember, ChannelSummary};
pub use queries::ChannelRepository;
