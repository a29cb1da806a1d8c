//! Timestamped JSON entries in client storage with a freshness window.

use std::{marker::PhantomData, sync::Arc};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::{Duration, OffsetDateTime};

use crate::core::{clock, storage::ClientStorage};

pub const DEFAULT_TTL: Duration = Duration::hours(24);

/// Stored shape: the payload's own fields plus a `timestamp` in unix millis.
#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    #[serde(flatten)]
    payload: T,
    timestamp: i64,
}

#[derive(Debug)]
pub struct TtlCache<S, T> {
    storage: Arc<S>,
    key: &'static str,
    ttl: Duration,
    _payload: PhantomData<fn() -> T>,
}

impl<S, T> Clone for TtlCache<S, T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            key: self.key,
            ttl: self.ttl,
            _payload: PhantomData,
        }
    }
}

impl<S: ClientStorage, T: Serialize + DeserializeOwned> TtlCache<S, T> {
    pub fn new(storage: Arc<S>, key: &'static str, ttl: Duration) -> Self {
        Self {
            storage,
            key,
            ttl,
            _payload: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub async fn get(&self) -> Option<T> {
        self.get_at(OffsetDateTime::now_utc()).await
    }

    /// Fresh payload at `now`. Expired or unreadable entries are removed.
    pub async fn get_at(&self, now: OffsetDateTime) -> Option<T> {
        let raw = match self.storage.get_item(self.key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = self.key, error = %e, "cache read failed");
                return None;
            }
        };
        let stamped = match serde_json::from_str::<Stamped<T>>(&raw) {
            Ok(stamped) => stamped,
            Err(e) => {
                tracing::warn!(key = self.key, error = %e, "discarding unreadable cache entry");
                self.clear().await;
                return None;
            }
        };
        let age_ms = clock::unix_millis(now) - stamped.timestamp;
        if age_ms >= self.ttl.whole_milliseconds() as i64 {
            tracing::debug!(key = self.key, age_ms, "cache entry expired");
            self.clear().await;
            return None;
        }
        Some(stamped.payload)
    }

    pub async fn put(&self, payload: T) -> anyhow::Result<()> {
        self.put_at(payload, OffsetDateTime::now_utc()).await
    }

    pub async fn put_at(&self, payload: T, at: OffsetDateTime) -> anyhow::Result<()> {
        let json = serde_json::to_string(&Stamped {
            payload,
            timestamp: clock::unix_millis(at),
        })?;
        self.storage.set_item(self.key, &json).await
    }

    pub async fn clear(&self) {
        if let Err(e) = self.storage.remove_item(self.key).await {
            tracing::warn!(key = self.key, error = %e, "failed to clear cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStorage;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        names: Vec<String>,
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let storage = Arc::new(MemoryStorage::new());
        let cache: TtlCache<_, Payload> = TtlCache::new(storage.clone(), "k", DEFAULT_TTL);
        let written = OffsetDateTime::now_utc() - Duration::hours(23);
        cache
            .put_at(Payload { names: vec!["a".into()] }, written)
            .await
            .unwrap();

        let fresh = cache.get_at(written + Duration::hours(23)).await;
        assert_eq!(fresh, Some(Payload { names: vec!["a".into()] }));

        assert_eq!(cache.get_at(written + Duration::hours(25)).await, None);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_stored_shape_flattens_payload() {
        let storage = Arc::new(MemoryStorage::new());
        let cache: TtlCache<_, Payload> = TtlCache::new(storage.clone(), "k", DEFAULT_TTL);
        cache.put(Payload { names: vec![] }).await.unwrap();

        let raw = storage.get_item("k").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("names").is_some());
        assert!(value.get("timestamp").is_some());
    }
}
