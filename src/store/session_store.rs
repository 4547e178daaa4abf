use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{self, CacheClient, CacheTransaction, Ttl};
use crate::store::{Error, KeyCodec, Result, StoreOptions};

/// Stores opaque session blobs in a remote cache under a time-to-live.
///
/// The store keeps no mutable state of its own: it can be cloned and shared
/// across tasks freely, and every guarantee about concurrent writers on the
/// same key comes from the cache's optimistic transactions. The cache client
/// is shared with the rest of the process, which owns its lifecycle.
///
/// Dropping a returned future cancels the operation along with every cache
/// call it has in flight. An update cancelled before its commit writes nothing.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use sesh::{SessionStore, StoreOptions};
/// use sesh::cache::MemoryCache;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), sesh::Error> {
/// let store = SessionStore::new(Arc::new(MemoryCache::new()))
///     .with_options(StoreOptions::build().key_prefix("user.profile"));
///
/// store.set("u1", b"profile-v1").await?;
/// store.update("u1", b"profile-v2").await?;
/// assert_eq!(store.get("u1").await?, b"profile-v2");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionStore<C> {
    client: Arc<C>,
    keys: KeyCodec,
    max_age: Duration,
    timeout: Option<Duration>,
}

impl<C> Clone for SessionStore<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            keys: self.keys.clone(),
            max_age: self.max_age,
            timeout: self.timeout,
        }
    }
}

impl<C> SessionStore<C>
where
    C: CacheClient,
{
    /// Creates a store with the default [`StoreOptions`].
    pub fn new(client: Arc<C>) -> Self {
        Self::with_client_and_options(client, StoreOptions::default())
    }

    pub fn with_options(self, options: StoreOptions) -> Self {
        Self::with_client_and_options(self.client, options)
    }

    fn with_client_and_options(client: Arc<C>, options: StoreOptions) -> Self {
        Self {
            client,
            keys: KeyCodec::new(options.key_prefix),
            max_age: options.max_age,
            timeout: options.timeout,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn keys(&self) -> &KeyCodec {
        &self.keys
    }

    /// Stores `value` as the session at `key`, replacing any previous value.
    ///
    /// This is a fresh write: the session lives for the configured max-age
    /// from now on, whatever remained of its previous lifetime.
    #[tracing::instrument(name = "setting session in cache", skip(self, value))]
    pub async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let key = self.keys.physical_key(key);

        self.bounded(async {
            self.client
                .set_with_expiry(&key, value, self.max_age)
                .await
                .map_err(|err| {
                    tracing::error!(err = %err, "failed to set session in cache");
                    Error::Unexpected
                })
        })
        .await
    }

    /// Gets the session stored at `key`.
    ///
    /// Reading does not touch the session's remaining lifetime.
    #[tracing::instrument(name = "getting session from cache", skip(self))]
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let key = self.keys.physical_key(key);

        self.bounded(async {
            match self.client.get(&key).await {
                Ok(Some(value)) => Ok(value),
                Ok(None) => {
                    tracing::debug!("session not found");
                    Err(Error::SessionNotFound)
                }
                Err(err) => {
                    tracing::error!(err = %err, "failed to get session from cache");
                    Err(Error::Unexpected)
                }
            }
        })
        .await
    }

    /// Replaces the session stored at `key` without changing when it expires.
    ///
    /// The remaining lifetime is read and the new value written inside one
    /// optimistic transaction on the key, so the value is rewritten with
    /// exactly the lifetime it had left. If another writer touches the key
    /// in between, nothing is written and the update fails with
    /// [`Error::Unexpected`]; the store does not retry.
    ///
    /// Updating a session that does not exist, or has expired, fails with
    /// [`Error::SessionNotFound`] and writes nothing. A value stored without
    /// an expiry stays without one.
    #[tracing::instrument(name = "updating session in cache", skip(self, value))]
    pub async fn update(&self, key: &str, value: &[u8]) -> Result<()> {
        let key = self.keys.physical_key(key);

        self.bounded(self.replace_keeping_ttl(&key, value)).await
    }

    async fn replace_keeping_ttl(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut trx = self.client.watch(key).await.map_err(|err| {
            tracing::error!(err = %err, "failed to watch session");
            Error::Unexpected
        })?;

        let expiry = match trx.ttl().await {
            Ok(Ttl::Expires(remaining)) if !remaining.is_zero() => Some(remaining),
            Ok(Ttl::Persistent) => None,
            Ok(_) => {
                tracing::debug!("session not found, nothing to update");
                release(trx).await;
                return Err(Error::SessionNotFound);
            }
            Err(err) => {
                tracing::error!(err = %err, "failed to read session ttl");
                release(trx).await;
                return Err(Error::Unexpected);
            }
        };

        trx.set(value, expiry);
        trx.commit().await.map_err(|err| {
            match &err {
                cache::Error::Aborted(_) => {
                    tracing::warn!(err = %err, "session modified concurrently, update dropped")
                }
                cache::Error::Backend(_) => {
                    tracing::error!(err = %err, "failed to commit session update")
                }
            }
            Error::Unexpected
        })
    }

    /// Deletes the session stored at `key`.
    #[tracing::instrument(name = "deleting session from cache", skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        let key = self.keys.physical_key(key);

        self.bounded(async {
            match self.client.delete(&key).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    tracing::debug!("session not found");
                    Err(Error::SessionNotFound)
                }
                Err(err) => {
                    tracing::error!(err = %err, "failed to delete session from cache");
                    Err(Error::Unexpected)
                }
            }
        })
        .await
    }

    /// Returns how long the session at `key` has left to live, or `None` if
    /// it never expires.
    #[tracing::instrument(name = "getting session ttl from cache", skip(self))]
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let key = self.keys.physical_key(key);

        self.bounded(async {
            match self.client.ttl(&key).await {
                Ok(Ttl::Expires(remaining)) => Ok(Some(remaining)),
                Ok(Ttl::Persistent) => Ok(None),
                Ok(Ttl::Missing) => Err(Error::SessionNotFound),
                Err(err) => {
                    tracing::error!(err = %err, "failed to get session ttl from cache");
                    Err(Error::Unexpected)
                }
            }
        })
        .await
    }

    async fn bounded<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(?limit, "session store operation timed out");
                    Err(Error::Unexpected)
                }),
            None => operation.await,
        }
    }
}

async fn release<T: CacheTransaction>(trx: T) {
    if let Err(err) = trx.discard().await {
        tracing::error!(err = %err, "failed to release session watch");
    }
}
