use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sesh::config::{RedisConfig, store_options_from_env};
use sesh::{SessionStore, codec};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Profile {
    id: i64,
    name: String,
    theme: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "sesh=debug".into()))
        .init();

    let cache = Arc::new(RedisConfig::from_env()?.connect_cache().await?);
    let store = SessionStore::new(Arc::clone(&cache)).with_options(store_options_from_env()?);

    let mut profile = Profile {
        id: 1001,
        name: String::from("Ada Example"),
        theme: None,
    };
    store.set("1001", &codec::encode(&profile)?).await?;

    profile.theme = Some(String::from("dark"));
    store.update("1001", &codec::encode(&profile)?).await?;

    let stored: Profile = codec::decode(&store.get("1001").await?)?;
    let remaining = store.ttl("1001").await?;
    tracing::info!(?stored, ?remaining, "session updated without touching its expiry");

    store.delete("1001").await?;
    cache.quit().await?;

    Ok(())
}
