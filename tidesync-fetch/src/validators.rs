//! Cache validators and the store that remembers them.
//!
//! A [`Validators`] pair is captured from a fresh (2xx) response and sent
//! back on the next request so the origin can answer 304. The store is
//! keyed by an opaque cache key, normally the owning task key.

use crate::error::{FetchError, Result};
use reqwest::header::{HeaderMap, HeaderName, ETAG, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Opaque server-supplied validators for one remote resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validators {
    /// Raw `Last-Modified` header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Raw `ETag` header value, quotes and weak prefix included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl Validators {
    /// Validators carrying only a `Last-Modified` value.
    pub fn last_modified(value: impl Into<String>) -> Self {
        Self {
            last_modified: Some(value.into()),
            etag: None,
        }
    }

    /// Validators carrying only an `ETag` value.
    pub fn etag(value: impl Into<String>) -> Self {
        Self {
            last_modified: None,
            etag: Some(value.into()),
        }
    }

    /// Returns `true` when neither validator is present.
    pub fn is_empty(&self) -> bool {
        self.last_modified.is_none() && self.etag.is_none()
    }

    /// Capture validators from response headers. Non-UTF-8 or blank values
    /// are ignored.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        Self {
            last_modified: read(LAST_MODIFIED),
            etag: read(ETAG),
        }
    }
}

/// Persistent per-key validator storage.
///
/// Implementations must be safe to call from several worker tasks at once;
/// callers never write the same key concurrently.
pub trait ValidatorStore: Send + Sync {
    /// Load the validators stored for `key`, if any.
    fn load(&self, key: &str) -> Result<Option<Validators>>;
    /// Overwrite the validators stored for `key`.
    fn save(&self, key: &str, validators: &Validators) -> Result<()>;
    /// Forget the validators for `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process validator store, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryValidatorStore {
    entries: Mutex<HashMap<String, Validators>>,
}

impl MemoryValidatorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Validators>>> {
        self.entries
            .lock()
            .map_err(|_| FetchError::Store("validator map lock poisoned".into()))
    }
}

impl ValidatorStore for MemoryValidatorStore {
    fn load(&self, key: &str) -> Result<Option<Validators>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn save(&self, key: &str, validators: &Validators) -> Result<()> {
        self.lock()?.insert(key.to_owned(), validators.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
