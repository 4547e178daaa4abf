use crate::cache::{CacheClient, CacheTransaction, Error, Ttl};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct StoredValue {
    data: Vec<u8>,
    expires_at: Option<Instant>,
    revision: u64,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map(|e| e > now).unwrap_or(true)
    }
}

fn invalid_expire_time() -> Error {
    Error::Backend("invalid expire time in 'set' command".to_string())
}

/// Computes when a write made at `now` expires, rejecting expiries Redis would.
fn deadline(now: Instant, expiry: Duration) -> Result<Instant, Error> {
    if expiry.is_zero() {
        return Err(invalid_expire_time());
    }

    now.checked_add(expiry).ok_or_else(invalid_expire_time)
}

#[derive(Debug, Default)]
struct Inner {
    entries: DashMap<String, StoredValue>,
    revision: AtomicU64,
}

impl Inner {
    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn live_revision(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.revision)
    }

    fn ttl(&self, key: &str) -> Ttl {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => match entry.expires_at {
                Some(expires_at) => Ttl::Expires(expires_at - now),
                None => Ttl::Persistent,
            },
            _ => Ttl::Missing,
        }
    }

    fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));
    }
}

/// An in-memory cache with Redis-like expiry and `WATCH` semantics.
///
/// Every write stamps the key with a fresh revision; a transaction commits only
/// if the key still carries the revision it had when the watch began. Expiry is
/// measured on [`tokio::time::Instant`], so paused-clock tests can advance it.
///
/// ### Note
///
/// Do not use this in a production environment.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<Inner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheClient for MemoryCache {
    type Transaction = MemoryTransaction;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        self.inner.cleanup_expired();

        Ok(self.inner.entries.get(key).map(|entry| entry.data.clone()))
    }

    async fn set_with_expiry(&self, key: &str, value: &[u8], expiry: Duration) -> Result<(), Error> {
        let expires_at = deadline(Instant::now(), expiry)?;

        self.inner.entries.insert(
            key.to_string(),
            StoredValue {
                data: value.to_vec(),
                expires_at: Some(expires_at),
                revision: self.inner.next_revision(),
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        self.inner.cleanup_expired();

        Ok(self.inner.entries.remove(key).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, Error> {
        Ok(self.inner.ttl(key))
    }

    async fn watch(&self, key: &str) -> Result<MemoryTransaction, Error> {
        Ok(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            key: key.to_string(),
            watched: self.inner.live_revision(key),
            queued: Vec::new(),
        })
    }
}

/// A pending transaction on a [`MemoryCache`] key.
#[derive(Debug)]
pub struct MemoryTransaction {
    inner: Arc<Inner>,
    key: String,
    watched: Option<u64>,
    queued: Vec<(Vec<u8>, Option<Duration>)>,
}

impl CacheTransaction for MemoryTransaction {
    async fn ttl(&mut self) -> Result<Ttl, Error> {
        Ok(self.inner.ttl(&self.key))
    }

    fn set(&mut self, value: &[u8], expiry: Option<Duration>) {
        self.queued.push((value.to_vec(), expiry));
    }

    async fn commit(mut self) -> Result<(), Error> {
        let now = Instant::now();

        // Every queued write targets the watched key, so only the last one survives.
        let write = match self.queued.pop() {
            Some((data, Some(expiry))) => Some((data, Some(deadline(now, expiry)?))),
            Some((data, None)) => Some((data, None)),
            None => None,
        };

        // The shard lock held by `slot` makes the revision check and the write atomic.
        let slot = self.inner.entries.entry(self.key.clone());
        let current = match &slot {
            Entry::Occupied(occupied) if occupied.get().is_live(now) => {
                Some(occupied.get().revision)
            }
            _ => None,
        };

        if current != self.watched {
            return Err(Error::Aborted(self.key.clone()));
        }

        if let Some((data, expires_at)) = write {
            let value = StoredValue {
                data,
                expires_at,
                revision: self.inner.next_revision(),
            };
            match slot {
                Entry::Occupied(mut occupied) => {
                    occupied.insert(value);
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(value);
                }
            }
        }

        Ok(())
    }

    async fn discard(self) -> Result<(), Error> {
        Ok(())
    }
}
