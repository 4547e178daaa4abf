#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use sesh::cache::{self, CacheClient, CacheTransaction, MemoryCache, MemoryTransaction, Ttl};
use sesh::{SessionStore, StoreOptions};
use std::sync::Arc;
use std::time::Duration;

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TestProfile {
    pub id: i64,
    pub name: String,
    pub roles: Vec<String>,
}

pub fn create_test_profile() -> TestProfile {
    TestProfile {
        id: 1,
        name: "Test User".to_string(),
        roles: vec!["admin".to_string()],
    }
}

pub fn build_store_options() -> StoreOptions {
    StoreOptions::build()
        .key_prefix("user.profile")
        .max_age(7 * DAY)
}

pub fn memory_store() -> (Arc<MemoryCache>, SessionStore<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let store = SessionStore::new(Arc::clone(&cache)).with_options(build_store_options());
    (cache, store)
}

/// Lets another writer slip in between a watch and its commit.
#[derive(Debug, Default)]
pub struct InterleavingCache {
    pub inner: MemoryCache,
    pub intruder_value: Vec<u8>,
    pub intruder_expiry: Duration,
}

impl CacheClient for InterleavingCache {
    type Transaction = MemoryTransaction;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, cache::Error> {
        self.inner.get(key).await
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &[u8],
        expiry: Duration,
    ) -> Result<(), cache::Error> {
        self.inner.set_with_expiry(key, value, expiry).await
    }

    async fn delete(&self, key: &str) -> Result<bool, cache::Error> {
        self.inner.delete(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, cache::Error> {
        self.inner.ttl(key).await
    }

    async fn watch(&self, key: &str) -> Result<MemoryTransaction, cache::Error> {
        let trx = self.inner.watch(key).await?;
        self.inner
            .set_with_expiry(key, &self.intruder_value, self.intruder_expiry)
            .await?;
        Ok(trx)
    }
}

/// Yields to the scheduler after reading a watched key's ttl, so concurrent
/// updates on one key all watch it before any of them commits. With
/// `stall_commit` set, commits never finish.
#[derive(Debug, Default)]
pub struct ContendedCache {
    pub inner: MemoryCache,
    pub stall_commit: bool,
}

impl CacheClient for ContendedCache {
    type Transaction = ContendedTransaction;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, cache::Error> {
        self.inner.get(key).await
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &[u8],
        expiry: Duration,
    ) -> Result<(), cache::Error> {
        self.inner.set_with_expiry(key, value, expiry).await
    }

    async fn delete(&self, key: &str) -> Result<bool, cache::Error> {
        self.inner.delete(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, cache::Error> {
        self.inner.ttl(key).await
    }

    async fn watch(&self, key: &str) -> Result<ContendedTransaction, cache::Error> {
        Ok(ContendedTransaction {
            inner: self.inner.watch(key).await?,
            stall_commit: self.stall_commit,
        })
    }
}

#[derive(Debug)]
pub struct ContendedTransaction {
    inner: MemoryTransaction,
    stall_commit: bool,
}

impl CacheTransaction for ContendedTransaction {
    async fn ttl(&mut self) -> Result<Ttl, cache::Error> {
        let ttl = self.inner.ttl().await;
        tokio::task::yield_now().await;
        ttl
    }

    fn set(&mut self, value: &[u8], expiry: Option<Duration>) {
        self.inner.set(value, expiry);
    }

    async fn commit(self) -> Result<(), cache::Error> {
        if self.stall_commit {
            std::future::pending::<()>().await;
        }
        self.inner.commit().await
    }

    async fn discard(self) -> Result<(), cache::Error> {
        self.inner.discard().await
    }
}

/// Never answers.
#[derive(Debug, Default)]
pub struct StalledCache;

impl CacheClient for StalledCache {
    type Transaction = MemoryTransaction;

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, cache::Error> {
        std::future::pending().await
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _value: &[u8],
        _expiry: Duration,
    ) -> Result<(), cache::Error> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> Result<bool, cache::Error> {
        std::future::pending().await
    }

    async fn ttl(&self, _key: &str) -> Result<Ttl, cache::Error> {
        std::future::pending().await
    }

    async fn watch(&self, _key: &str) -> Result<MemoryTransaction, cache::Error> {
        std::future::pending().await
    }
}

/// Fails every command, like a cache whose connection dropped.
#[derive(Debug, Default)]
pub struct BrokenCache;

fn connection_closed() -> cache::Error {
    cache::Error::Backend("connection closed".to_string())
}

impl CacheClient for BrokenCache {
    type Transaction = MemoryTransaction;

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, cache::Error> {
        Err(connection_closed())
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _value: &[u8],
        _expiry: Duration,
    ) -> Result<(), cache::Error> {
        Err(connection_closed())
    }

    async fn delete(&self, _key: &str) -> Result<bool, cache::Error> {
        Err(connection_closed())
    }

    async fn ttl(&self, _key: &str) -> Result<Ttl, cache::Error> {
        Err(connection_closed())
    }

    async fn watch(&self, _key: &str) -> Result<MemoryTransaction, cache::Error> {
        Err(connection_closed())
    }
}
