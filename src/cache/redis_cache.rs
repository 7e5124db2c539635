use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use super::{CacheError, RevocationCache, blacklist_key};

/// Blacklist stored in Redis as `blacklist:{jti}` = subject, with `EX` set to the
/// token's remaining lifetime.
#[derive(Clone)]
pub struct RedisRevocationCache {
    conn: ConnectionManager,
}

impl RedisRevocationCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(backend)?;
        let conn = ConnectionManager::new(client).await.map_err(backend)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl RevocationCache for RedisRevocationCache {
    async fn blacklist(
        &self,
        token_id: &str,
        subject_id: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        // EX 0 is rejected by redis
        let secs = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(blacklist_key(token_id), subject_id, secs)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn is_blacklisted(&self, token_id: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        conn.exists(blacklist_key(token_id)).await.map_err(backend)
    }
}

fn backend(err: redis::RedisError) -> CacheError {
    CacheError::Backend(err.to_string())
}
