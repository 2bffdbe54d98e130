// ABOUTME: Library root for releasectl - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod error;
pub mod exec;
pub mod output;
pub mod release;
pub mod types;
