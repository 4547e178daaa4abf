//! The remote key-value cache the session store is built on.
//!
//! [`CacheClient`] is the narrow surface the store consumes: plain reads and
//! writes with an expiry, deletes, TTL queries, and an optimistic transaction
//! ([`CacheClient::watch`]) that only commits if the watched key was left
//! untouched by every other writer.

mod memory;
pub use memory::{MemoryCache, MemoryTransaction};

#[cfg(feature = "redis-store")]
pub mod redis;

use std::future::Future;
use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The watched key was modified between the watch and the commit.
    #[error("transaction aborted: `{0}` was modified while watched")]
    Aborted(String),

    #[error("{0}")]
    Backend(String),
}

#[cfg(feature = "redis-store")]
impl From<fred::error::Error> for Error {
    fn from(err: fred::error::Error) -> Self {
        Error::Backend(err.to_string())
    }
}

/// Remaining lifetime of a key, as reported by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key exists and is evicted after the given duration.
    Expires(Duration),
    /// The key exists and has no expiry.
    Persistent,
    /// The key does not exist, or has already expired.
    Missing,
}

impl Ttl {
    /// Maps a Redis `PTTL` reply onto a [`Ttl`].
    ///
    /// `-2` means the key is missing and `-1` means it has no expiry.
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            -1 => Ttl::Persistent,
            ms if ms < 0 => Ttl::Missing,
            ms => Ttl::Expires(Duration::from_millis(ms as u64)),
        }
    }

    /// Returns the remaining duration for keys that expire.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Ttl::Expires(remaining) => Some(*remaining),
            _ => None,
        }
    }
}

/// A connection to a remote key-value cache.
///
/// Implementations must be safe to share between concurrent callers; the
/// session store adds no locking or pooling of its own.
pub trait CacheClient: Send + Sync + 'static {
    type Transaction: CacheTransaction;

    /// Gets the bytes stored at `key`, or `None` if the key is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, Error>> + Send;

    /// Stores `value` at `key`, evicting it after `expiry`.
    ///
    /// Overwrites any existing value and its expiry.
    fn set_with_expiry(
        &self,
        key: &str,
        value: &[u8],
        expiry: Duration,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes `key`.
    ///
    /// Returns `true` if a key was removed, `false` if it was absent.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Returns the remaining lifetime of `key`.
    fn ttl(&self, key: &str) -> impl Future<Output = Result<Ttl, Error>> + Send;

    /// Starts an optimistic transaction watching `key`.
    fn watch(&self, key: &str) -> impl Future<Output = Result<Self::Transaction, Error>> + Send;
}

/// An optimistic transaction over a single watched key.
///
/// Reads issued through the transaction observe the key while it is watched.
/// Writes are queued and only applied by [`commit`](CacheTransaction::commit),
/// all or nothing, and only if no other writer touched the key since the watch
/// began.
pub trait CacheTransaction: Send {
    /// Returns the remaining lifetime of the watched key.
    fn ttl(&mut self) -> impl Future<Output = Result<Ttl, Error>> + Send;

    /// Queues a write of `value` to the watched key. `None` stores it without
    /// an expiry.
    fn set(&mut self, value: &[u8], expiry: Option<Duration>);

    /// Applies the queued writes.
    ///
    /// Fails with [`Error::Aborted`] if the watched key changed.
    fn commit(self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Releases the watch without writing anything.
    fn discard(self) -> impl Future<Output = Result<(), Error>> + Send;
}
