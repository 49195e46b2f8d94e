//! Error types for the tidesync-fetch crate.
//!
//! Every failure a conditional fetch can hit ends up here. Callers treat
//! all variants the same way: the owning task fails and no validator is
//! written.

/// Errors that can occur while fetching a remote resource.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure: connection refused, DNS, TLS, timeout.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The origin answered with a status other than 2xx or 304.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response body could not be decoded into records.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid fetch configuration or request URL.
    #[error("config error: {0}")]
    Config(String),

    /// The validator store could not be read or written.
    #[error("validator store error: {0}")]
    Store(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Http(format!("request timed out: {err}"))
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Convenience type alias for tidesync-fetch results.
pub type Result<T> = std::result::Result<T, FetchError>;
