use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheError, RevocationCache, blacklist_key};

#[derive(Clone)]
struct Entry {
    subject_id: String,
    expires_at: Instant,
}

/// Process-local blacklist. Good for development and tests; entries are not
/// shared between instances.
#[derive(Clone, Default)]
pub struct InMemoryRevocationCache {
    store: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryRevocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subject and time left of a live entry.
    pub(crate) async fn live_entry(&self, token_id: &str) -> Option<(String, Duration)> {
        let store = self.store.read().await;
        let entry = store.get(&blacklist_key(token_id))?;
        let left = entry.expires_at.checked_duration_since(Instant::now())?;
        (!left.is_zero()).then(|| (entry.subject_id.clone(), left))
    }
}

#[async_trait]
impl RevocationCache for InMemoryRevocationCache {
    async fn blacklist(
        &self,
        token_id: &str,
        subject_id: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut store = self.store.write().await;
        store.retain(|_, entry| entry.expires_at > now);
        store.insert(
            blacklist_key(token_id),
            Entry {
                subject_id: subject_id.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn is_blacklisted(&self, token_id: &str) -> Result<bool, CacheError> {
        let store = self.store.read().await;
        Ok(store
            .get(&blacklist_key(token_id))
            .is_some_and(|entry| entry.expires_at > Instant::now()))
    }
}
