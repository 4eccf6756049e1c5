//! Integration test common infrastructure.
//!
//! Spawns the app in-process against an in-memory database and provides a
//! thin JSON client over reqwest.

pub mod server;

#[allow(unused_imports)]
pub use server::TestApp;
