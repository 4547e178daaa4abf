use crate::cache::{CacheClient, CacheTransaction, Error, Ttl};
use fred::clients::{Client, ExclusivePool};
use fred::prelude::*;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

/// A [`CacheClient`] backed by `fred` Redis clients.
///
/// Plain commands are pipelined on a shared `client`. `WATCH` state belongs
/// to a connection, so each transaction instead acquires a connection of its
/// own from `watchers` and holds it from `WATCH` to `EXEC`; transactions on
/// different connections never clear each other's watches. The pool size
/// bounds how many updates can be in flight at once.
///
/// Both are borrowed from the caller, who connects them before use and shuts
/// them down with the process.
pub struct RedisCache {
    client: Client,
    watchers: ExclusivePool,
}

impl RedisCache {
    pub fn new(client: Client, watchers: ExclusivePool) -> Self {
        Self { client, watchers }
    }

    /// Closes the shared client and every pooled connection.
    pub async fn quit(&self) -> Result<(), Error> {
        self.client.quit().await?;
        self.watchers.quit().await?;

        Ok(())
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

/// Converts to a `PX` expiry, rounding partial milliseconds up so a non-zero
/// duration never becomes the invalid `PX 0`.
fn px(expiry: Duration) -> Expiration {
    let millis = expiry.as_millis() + u128::from(expiry.subsec_nanos() % 1_000_000 != 0);
    Expiration::PX(millis.min(i64::MAX as u128) as i64)
}

impl CacheClient for RedisCache {
    type Transaction = RedisTransaction;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.client.get::<Option<Vec<u8>>, _>(key).await?)
    }

    async fn set_with_expiry(&self, key: &str, value: &[u8], expiry: Duration) -> Result<(), Error> {
        let _: () = self
            .client
            .set(key, value.to_vec(), Some(px(expiry)), None, false)
            .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        let deleted: i64 = self.client.del(key).await?;

        Ok(deleted > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, Error> {
        let millis: i64 = self.client.pttl(key).await?;

        Ok(Ttl::from_millis(millis))
    }

    async fn watch(&self, key: &str) -> Result<RedisTransaction, Error> {
        let client = self.watchers.acquire().await;
        // A transaction dropped before `EXEC` returns its connection still watching.
        client.unwatch().await?;
        client.watch(key).await?;

        Ok(RedisTransaction {
            client,
            key: key.to_string(),
            queued: Vec::new(),
        })
    }
}

/// A `WATCH`ed key with its writes held back until
/// [`commit`](CacheTransaction::commit) sends them in one `MULTI`/`EXEC`.
///
/// The connection goes back to the pool when the transaction is dropped.
pub struct RedisTransaction {
    client: OwnedMutexGuard<Client>,
    key: String,
    queued: Vec<(Vec<u8>, Option<Duration>)>,
}

impl std::fmt::Debug for RedisTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTransaction")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl CacheTransaction for RedisTransaction {
    async fn ttl(&mut self) -> Result<Ttl, Error> {
        let millis: i64 = self.client.pttl(self.key.as_str()).await?;

        Ok(Ttl::from_millis(millis))
    }

    fn set(&mut self, value: &[u8], expiry: Option<Duration>) {
        self.queued.push((value.to_vec(), expiry));
    }

    async fn commit(self) -> Result<(), Error> {
        // `Transaction` buffers commands in memory; only `exec` talks to Redis.
        let trx = self.client.multi();
        for (value, expiry) in self.queued {
            let _: Value = trx
                .set(self.key.as_str(), value, expiry.map(px), None, false)
                .await?;
        }

        let result: Value = trx.exec(true).await?;
        if result.is_null() {
            return Err(Error::Aborted(self.key));
        }

        Ok(())
    }

    async fn discard(self) -> Result<(), Error> {
        self.client.unwatch().await?;

        Ok(())
    }
}
