use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::client::RawPayload;
use super::request::RequestKey;

/// Default freshness window for cached provider responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CacheEntry {
    value: RawPayload,
    inserted_at: Instant,
}

/// Time-bounded response cache keyed by [`RequestKey`].
///
/// Expiry is lazy: a stale entry is ignored on read and dropped the next time
/// a writer touches the map. No sweeper task runs.
pub struct ResponseCache {
    entries: RwLock<HashMap<RequestKey, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached payload for `key` if it is younger than the TTL.
    pub fn get(&self, key: &RequestKey) -> Option<RawPayload> {
        let map = self.entries.read();
        let entry = map.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            debug!(key = %key, "cache entry expired");
            None
        }
    }

    /// Store `value` stamped with the current instant, replacing any previous
    /// entry for `key`.
    pub fn put(&self, key: RequestKey, value: RawPayload) {
        let mut map = self.entries.write();
        let ttl = self.ttl;
        map.retain(|_, e| e.inserted_at.elapsed() < ttl);
        map.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn payload(v: serde_json::Value) -> RawPayload {
        Arc::new(v)
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_returns_same_payload() {
        let cache = ResponseCache::default();
        let key = RequestKey::daily("IBM");
        let value = payload(serde_json::json!({ "a": 1 }));

        cache.put(key.clone(), value.clone());
        tokio::time::advance(Duration::from_secs(59)).await;

        let hit = cache.get(&key).expect("entry should still be fresh");
        assert!(Arc::ptr_eq(&hit, &value));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let key = RequestKey::daily("IBM");
        cache.put(key.clone(), payload(serde_json::json!({})));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(cache.get(&key).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entry_stays_stored_until_next_put() {
        let cache = ResponseCache::new(Duration::from_secs(5));
        let key = RequestKey::daily("IBM");
        cache.put(key.clone(), payload(serde_json::json!({})));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 1);

        cache.put(RequestKey::daily("MSFT"), payload(serde_json::json!({})));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn put_overwrites_and_restamps() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        let key = RequestKey::global_quote("MSFT");
        cache.put(key.clone(), payload(serde_json::json!({ "v": 1 })));

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put(key.clone(), payload(serde_json::json!({ "v": 2 })));
        tokio::time::advance(Duration::from_secs(8)).await;

        let hit = cache.get(&key).expect("restamped entry is fresh");
        assert_eq!(hit["v"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn writers_drop_stale_entries() {
        let cache = ResponseCache::new(Duration::from_secs(1));
        cache.put(RequestKey::daily("A"), payload(serde_json::json!({})));
        cache.put(RequestKey::daily("B"), payload(serde_json::json!({})));
        assert_eq!(cache.len(), 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        cache.put(RequestKey::daily("C"), payload(serde_json::json!({})));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = Arc::new(ResponseCache::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let key = RequestKey::daily(&format!("SYM{i}"));
                    for n in 0..100 {
                        cache.put(key.clone(), Arc::new(serde_json::json!({ "n": n })));
                        assert!(cache.get(&key).is_some());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 8);
    }
}
