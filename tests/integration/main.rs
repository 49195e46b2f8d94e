//! Integration test binary -- all integration tests consolidated into a single
//! binary to keep link times down.

// Allow unwrap/expect in test code
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod helpers;

mod cli;
mod conditional_refresh;
mod config_roundtrip;
mod cooldown_persistence;
mod error_recovery;
