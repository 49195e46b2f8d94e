//! Application directory paths for tidesync.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | State (cooldowns, validators, data) | `~/Library/Application Support/tidesync/` | `~/.local/share/tidesync/` |
//! | Config | `~/Library/Application Support/tidesync/` | `~/.config/tidesync/` |
//!
//! # Environment Overrides
//!
//! - `TIDESYNC_DATA_DIR` overrides [`data_dir`]
//! - `TIDESYNC_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Persistent state root.
///
/// Resolves to `dirs::data_dir()/tidesync/` by default. Override with
/// the `TIDESYNC_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("TIDESYNC_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("tidesync"))
        .unwrap_or_else(|| PathBuf::from("/tmp/tidesync-data"))
}

/// Configuration directory.
///
/// Resolves to `dirs::config_dir()/tidesync/` by default. Override with
/// the `TIDESYNC_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("TIDESYNC_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("tidesync"))
        .unwrap_or_else(|| PathBuf::from("/tmp/tidesync-config"))
}

/// Default config file (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
