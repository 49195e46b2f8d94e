//! # tidesync-fetch
//!
//! Conditional HTTP reads for tidesync's marine data feeds.
//!
//! A fetch attaches the validators (`Last-Modified` / `ETag`) stored for a
//! cache key. When the origin answers 304 the caller gets
//! [`Fetched::NotModified`] and skips any downstream write; when it answers
//! 2xx the body is decoded and the fresh validators are handed back for the
//! caller to commit once the data has been stored.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tidesync_fetch::{ConditionalFetcher, FetchConfig, JsonDecoder, MemoryValidatorStore};
//!
//! # async fn example() -> Result<(), tidesync_fetch::FetchError> {
//! let fetcher = ConditionalFetcher::new(
//!     &FetchConfig::default(),
//!     Arc::new(MemoryValidatorStore::new()),
//! )?;
//! let decoder = JsonDecoder::<Vec<serde_json::Value>>::new();
//! let written = fetcher
//!     .fetch_and_apply::<_, _, _, tidesync_fetch::FetchError>(
//!         "tides_catalog",
//!         "https://example.test/stations.json",
//!         &decoder,
//!         |stations| Ok(stations.len()),
//!     )
//!     .await?;
//! println!("rows written: {written:?}");
//! # Ok(())
//! # }
//! ```

pub mod conditional;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod validators;

pub use conditional::{ConditionalFetcher, Fetched};
pub use config::FetchConfig;
pub use decode::{Decoder, JsonDecoder};
pub use error::{FetchError, Result};
pub use validators::{MemoryValidatorStore, ValidatorStore, Validators};
