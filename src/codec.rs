//! Typed helpers for turning session structs into the opaque bytes a
//! [`SessionStore`](crate::SessionStore) persists.
//!
//! The store never calls these itself. The backend is chosen at compile time:
//! [`bincode`](https://crates.io/crates/bincode) with the `bincode` feature (the
//! default), or [MessagePack](https://crates.io/crates/rmp-serde) with
//! `messagepack`.

use serde::{Serialize, de::DeserializeOwned};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Encoding failed with: {0}")]
    Encode(String),

    #[error("Decoding failed with: {0}")]
    Decode(String),
}

#[cfg(feature = "bincode")]
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(feature = "bincode")]
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| Error::Decode(e.to_string()))
}

#[cfg(all(feature = "messagepack", not(feature = "bincode")))]
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    rmp_serde::to_vec(value).map_err(|e| Error::Encode(e.to_string()))
}

#[cfg(all(feature = "messagepack", not(feature = "bincode")))]
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
}
