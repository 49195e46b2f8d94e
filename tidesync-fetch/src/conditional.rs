//! Conditional GET with stored validators.
//!
//! [`ConditionalFetcher::fetch`] attaches whatever validators are stored for
//! a cache key and reports either a decoded fresh body or
//! [`Fetched::NotModified`]. It never writes validators itself: callers
//! persist them with [`ConditionalFetcher::commit`] once the fresh body has
//! been applied downstream, or use [`ConditionalFetcher::fetch_and_apply`]
//! which does both in the right order.

use crate::config::FetchConfig;
use crate::decode::Decoder;
use crate::error::{FetchError, Result};
use crate::http::build_client;
use crate::validators::{ValidatorStore, Validators};
use reqwest::header::{IF_MODIFIED_SINCE, IF_NONE_MATCH};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};
use url::Url;

/// Outcome of a conditional fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    /// 2xx: the body changed (or was never seen) and has been decoded.
    Fresh {
        /// Decoded records.
        body: T,
        /// Validators captured from this response, not yet stored.
        validators: Validators,
    },
    /// 304: the origin reports the resource unchanged.
    NotModified,
}

impl<T> Fetched<T> {
    /// Returns `true` when a fresh body is present.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }
}

/// Cache-aware remote reader.
#[derive(Clone)]
pub struct ConditionalFetcher {
    client: reqwest::Client,
    validators: Arc<dyn ValidatorStore>,
}

impl std::fmt::Debug for ConditionalFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalFetcher").finish_non_exhaustive()
    }
}

impl ConditionalFetcher {
    /// Build a fetcher with a client configured from `config`.
    pub fn new(config: &FetchConfig, validators: Arc<dyn ValidatorStore>) -> Result<Self> {
        Ok(Self::with_client(build_client(config)?, validators))
    }

    /// Build a fetcher around an existing client.
    pub fn with_client(client: reqwest::Client, validators: Arc<dyn ValidatorStore>) -> Self {
        Self { client, validators }
    }

    /// Validators currently stored for `cache_key`.
    pub fn stored_validators(&self, cache_key: &str) -> Result<Option<Validators>> {
        self.validators.load(cache_key)
    }

    /// Issue a GET for `url`, conditional on the validators stored under
    /// `cache_key`, and decode a fresh body with `decoder`.
    ///
    /// # Errors
    ///
    /// Any status other than 2xx/304, transport failures, and decode
    /// failures are returned as [`FetchError`]. The validator store is
    /// never modified.
    pub async fn fetch<D: Decoder>(
        &self,
        cache_key: &str,
        url: &str,
        decoder: &D,
    ) -> Result<Fetched<D::Output>> {
        let url =
            Url::parse(url).map_err(|e| FetchError::Config(format!("invalid URL {url}: {e}")))?;
        let stored = self.validators.load(cache_key)?;

        let mut request = self.client.get(url.clone());
        if let Some(stored) = &stored {
            if let Some(etag) = &stored.etag {
                trace!(key = cache_key, etag = %etag, "sending If-None-Match");
                request = request.header(IF_NONE_MATCH, etag.as_str());
            }
            if let Some(last_modified) = &stored.last_modified {
                trace!(key = cache_key, last_modified = %last_modified, "sending If-Modified-Since");
                request = request.header(IF_MODIFIED_SINCE, last_modified.as_str());
            }
        }

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            if stored.is_none() {
                warn!(key = cache_key, %url, "304 received without a stored validator");
            }
            debug!(
                key = cache_key,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "resource not modified"
            );
            return Ok(Fetched::NotModified);
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let validators = Validators::from_headers(response.headers());
        let bytes = response.bytes().await?;
        let body = decoder.decode(&bytes)?;

        debug!(
            key = cache_key,
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fresh resource fetched"
        );

        Ok(Fetched::Fresh { body, validators })
    }

    /// Persist validators from a fresh response. An empty pair clears any
    /// previously stored validators so stale ones are not replayed.
    pub fn commit(&self, cache_key: &str, validators: &Validators) -> Result<()> {
        if validators.is_empty() {
            self.validators.remove(cache_key)
        } else {
            self.validators.save(cache_key, validators)
        }
    }

    /// Fetch, hand a fresh body to `apply`, then commit its validators.
    ///
    /// Returns `Ok(None)` on 304 without calling `apply`. Validators are
    /// only committed after `apply` succeeds, so a failed downstream write
    /// is retried in full on the next fetch.
    pub async fn fetch_and_apply<D, F, R, E>(
        &self,
        cache_key: &str,
        url: &str,
        decoder: &D,
        apply: F,
    ) -> std::result::Result<Option<R>, E>
    where
        D: Decoder,
        F: FnOnce(D::Output) -> std::result::Result<R, E>,
        E: From<FetchError>,
    {
        match self.fetch(cache_key, url, decoder).await? {
            Fetched::NotModified => Ok(None),
            Fetched::Fresh { body, validators } => {
                let applied = apply(body)?;
                self.commit(cache_key, &validators)?;
                Ok(Some(applied))
            }
        }
    }
}
