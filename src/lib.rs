//! # Sesh: session persistence on a remote cache
//!
//! `sesh` stores opaque session blobs in a key-value cache under a
//! time-to-live. Sessions can be read back by key and updated in place
//! **without resetting their remaining lifetime**: an update rewrites the
//! value with exactly the time it had left, using the cache's optimistic
//! transactions (`WATCH`/`MULTI`/`EXEC` on Redis) so concurrent writers on the
//! same key can never clobber each other's expiry.
//!
//! # Quick Start
//!
//! Here's a basic example with the Redis cache. This requires the
//! `redis-store` feature (enabled by default).
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sesh::cache::redis::RedisCache;
//! use sesh::config::RedisConfig;
//! use sesh::{SessionStore, StoreOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Connect the cache; the process owns its connections and closes them
//!     // on shutdown.
//!     let cache = RedisConfig::from_env().unwrap().connect_cache().await.unwrap();
//!
//!     // Create session store
//!     let store = SessionStore::new(Arc::new(cache))
//!         .with_options(
//!             StoreOptions::build()
//!                 .key_prefix("user.profile")
//!                 .max_age(Duration::from_secs(7 * 24 * 60 * 60)),
//!         );
//!
//!     store.set("u1", b"profile-v1").await.unwrap();
//!
//!     // Rewrites the value; the session still expires 7 days after `set`.
//!     store.update("u1", b"profile-v2").await.unwrap();
//!
//!     let profile = store.get("u1").await.unwrap();
//!     assert_eq!(profile, b"profile-v2");
//! }
//! ```
//!
//! # Errors
//!
//! Every operation fails with one of two kinds, whatever cache sits below:
//! [`Error::SessionNotFound`] when the session is absent or expired, and
//! [`Error::Unexpected`] for everything else, including an update that lost a
//! race against another writer. The store never retries; callers decide.
//!
//! # Caches
//!
//! The store talks to any [`cache::CacheClient`]:
//!
//! - [`cache::redis::RedisCache`] (feature `redis-store`), built on
//!   [`fred`](https://docs.rs/fred).
//! - [`cache::MemoryCache`], an in-process implementation with the same
//!   expiry and watch semantics, for tests.
//!
//! ## Serialization
//! The store persists bytes and never looks inside them. The [`codec`]
//! helpers turn serde types into those bytes with one of two backends:
//!
//! - [`bincode`](https://crates.io/crates/bincode) (default) - Fast, compact binary serialization.
//! - [`rmp-serde`](https://crates.io/crates/rmp-serde) (MessagePack) - Cross-language compatible serialization.
//!
//! To use `MessagePack` instead of the default `bincode`:
//!
//! ```toml
//! [dependencies]
//! sesh = { version = "0.1", default-features = false, features = ["redis-store", "messagepack"] }
//! ```

#[cfg(feature = "redis-store")]
pub use fred;

pub mod cache;
#[cfg(any(feature = "bincode", feature = "messagepack"))]
pub mod codec;
pub mod config;

mod store;
pub use store::*;
