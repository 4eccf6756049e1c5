//! nestboard - community forum core for the Nestboard baby-sleep support app.
//!
//! Implements the channel directory, membership and opt-out store, the
//! invitation state machine, the access gate for post reads/writes, and
//! per-recipient notification fan-out, exposed as a JSON HTTP service over
//! SQLite. Authentication, AI chat, file storage, DMs, and profiles are
//! external collaborators and live elsewhere.

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics;
pub mod moderation;
