//! Body decoders.
//!
//! A [`Decoder`] turns the raw bytes of a fresh response into typed
//! records. Decoders only run on 2xx responses.

use crate::error::{FetchError, Result};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Pure conversion from a response body to records.
pub trait Decoder: Send + Sync {
    /// Decoded record type.
    type Output: Send;

    /// Decode a complete response body.
    fn decode(&self, body: &[u8]) -> Result<Self::Output>;
}

/// Decodes a JSON document into `T` with serde.
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    /// Create a decoder for `T`.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Decoder for JsonDecoder<T>
where
    T: DeserializeOwned + Send,
{
    type Output = T;

    fn decode(&self, body: &[u8]) -> Result<T> {
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
