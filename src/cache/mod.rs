//! Revocation cache: short-lived blacklist of access-token ids.

mod memory;
mod redis_cache;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

pub use memory::InMemoryRevocationCache;
pub use redis_cache::RedisRevocationCache;

use crate::config::CacheConfig;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait RevocationCache: Send + Sync {
    /// Marks `token_id` as revoked for `ttl`; the entry disappears once the token
    /// would have expired anyway.
    async fn blacklist(
        &self,
        token_id: &str,
        subject_id: &str,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    async fn is_blacklisted(&self, token_id: &str) -> Result<bool, CacheError>;
}

pub fn blacklist_key(token_id: &str) -> String {
    format!("blacklist:{token_id}")
}

/// Redis when a URL is configured, otherwise a process-local map.
pub async fn from_config(cfg: &CacheConfig) -> anyhow::Result<Arc<dyn RevocationCache>> {
    match cfg.redis_url.as_deref() {
        Some(url) => {
            let cache = RedisRevocationCache::connect(url).await?;
            tracing::info!("revocation cache backed by redis");
            Ok(Arc::new(cache))
        }
        None => {
            tracing::warn!("no redis url configured; revocation cache is in-memory");
            Ok(Arc::new(InMemoryRevocationCache::new()))
        }
    }
}
