//! Fetch configuration with sensible defaults.
//!
//! [`FetchConfig`] bounds how long a single conditional GET may take. The
//! scheduler has no cancellation, so these timeouts are the only limit on
//! how long a fetch task can occupy its key.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};

/// HTTP settings shared by every fetch task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Overall request timeout in seconds (connect + headers + body).
    pub timeout_seconds: u64,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_seconds: u64,
    /// Custom User-Agent string. Defaults to `tidesync/<version>`.
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
            user_agent: None,
        }
    }
}

impl FetchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.timeout_seconds == 0 {
            return Err(FetchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.connect_timeout_seconds == 0 {
            return Err(FetchError::Config(
                "connect_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.connect_timeout_seconds > self.timeout_seconds {
            return Err(FetchError::Config(
                "connect_timeout_seconds must be <= timeout_seconds".into(),
            ));
        }
        if matches!(self.user_agent.as_deref(), Some(ua) if ua.trim().is_empty()) {
            return Err(FetchError::Config("user_agent must not be blank".into()));
        }
        Ok(())
    }

    /// The User-Agent header value to send.
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("tidesync/{}", env!("CARGO_PKG_VERSION")))
    }
}
