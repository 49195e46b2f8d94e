//! Shared HTTP client for feed requests.

use crate::config::FetchConfig;
use crate::error::FetchError;
use std::time::Duration;

/// Build a [`reqwest::Client`] configured for conditional feed requests.
///
/// The client has:
/// - Connect and overall timeouts from config
/// - The configured (or default) User-Agent
/// - Gzip decompression
///
/// # Errors
///
/// Returns [`FetchError::Config`] for an invalid config and
/// [`FetchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client, FetchError> {
    config.validate()?;

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .user_agent(config.user_agent())
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| FetchError::Http(format!("failed to build HTTP client: {e}")))
}
