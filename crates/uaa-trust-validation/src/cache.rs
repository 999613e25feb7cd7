//! Public key cache.
//!
//! This module provides an in-memory cache of constructed verification keys,
//! keyed by `(key type, key id)`. Entries expire after a time-to-live so that
//! key rotation at the issuer is picked up without an invalidation signal.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use uaa_trust_core::KeyIdentifier;

/// A constructed key with its insertion time.
#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    inserted_at: Instant,
}

/// A bounded cache of verification keys with per-entry TTL.
///
/// Reads take a shared lock and never block each other. Concurrent misses for
/// the same key may both populate the cache; the last write wins, which is
/// harmless because a key id resolves to the same material within its TTL.
pub struct PublicKeyCache {
    entries: RwLock<HashMap<KeyIdentifier, CachedKey>>,
    ttl: Duration,
    max_size: usize,
}

impl PublicKeyCache {
    /// Create an empty cache.
    ///
    /// A `max_size` of zero is treated as one.
    #[must_use]
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_size: max_size.max(1),
        }
    }

    /// Get the key for an identifier, if cached and not expired.
    #[must_use]
    pub fn get(&self, id: &KeyIdentifier) -> Option<DecodingKey> {
        self.get_at(id, Instant::now())
    }

    /// Insert or replace the key for an identifier.
    pub fn put(&self, id: KeyIdentifier, key: DecodingKey) {
        self.put_at(id, key, Instant::now());
    }

    pub(crate) fn get_at(&self, id: &KeyIdentifier, now: Instant) -> Option<DecodingKey> {
        let entries = self.entries.read();
        entries
            .get(id)
            .filter(|entry| now.saturating_duration_since(entry.inserted_at) < self.ttl)
            .map(|entry| entry.key.clone())
    }

    pub(crate) fn put_at(&self, id: KeyIdentifier, key: DecodingKey, now: Instant) {
        let mut entries = self.entries.write();

        let ttl = self.ttl;
        entries.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);

        if !entries.contains_key(&id) && entries.len() >= self.max_size {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(oldest, _)| oldest.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(key = %oldest, "Evicting oldest cached public key");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            id,
            CachedKey {
                key,
                inserted_at: now,
            },
        );
    }

    /// Remove the key for an identifier.
    pub fn remove(&self, id: &KeyIdentifier) -> bool {
        self.entries.write().remove(id).is_some()
    }

    /// Check if a non-expired key is cached for an identifier.
    #[must_use]
    pub fn contains(&self, id: &KeyIdentifier) -> bool {
        self.get(id).is_some()
    }

    /// Get the number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clear all cached keys.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// The configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for PublicKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKeyCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uaa_trust_core::KeyType;

    fn key() -> DecodingKey {
        DecodingKey::from_secret(b"not-an-rsa-key")
    }

    fn rsa(kid: &str) -> KeyIdentifier {
        KeyIdentifier::new(KeyType::Rsa, kid)
    }

    #[test]
    fn cache_put_and_get() {
        let cache = PublicKeyCache::new(Duration::from_secs(60), 10);
        assert!(cache.get(&rsa("key-id-1")).is_none());

        cache.put(rsa("key-id-1"), key());

        assert!(cache.get(&rsa("key-id-1")).is_some());
        assert!(cache.contains(&rsa("key-id-1")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lookup_requires_matching_key_type() {
        let cache = PublicKeyCache::new(Duration::from_secs(60), 10);
        cache.put(rsa("key-id-1"), key());

        assert!(cache
            .get(&KeyIdentifier::new(KeyType::Ec, "key-id-1"))
            .is_none());
        assert!(cache.get(&rsa("key-id-2")).is_none());
    }

    #[test]
    fn expired_entries_are_absent() {
        let cache = PublicKeyCache::new(Duration::from_secs(60), 10);
        let start = Instant::now();
        cache.put_at(rsa("key-id-1"), key(), start);

        assert!(cache
            .get_at(&rsa("key-id-1"), start + Duration::from_secs(59))
            .is_some());
        assert!(cache
            .get_at(&rsa("key-id-1"), start + Duration::from_secs(60))
            .is_none());
    }

    #[test]
    fn put_purges_expired_entries() {
        let cache = PublicKeyCache::new(Duration::from_secs(60), 10);
        let start = Instant::now();
        cache.put_at(rsa("old"), key(), start);
        cache.put_at(rsa("new"), key(), start + Duration::from_secs(120));

        assert_eq!(cache.len(), 1);
        assert!(cache
            .get_at(&rsa("new"), start + Duration::from_secs(121))
            .is_some());
    }

    #[test]
    fn overflow_evicts_oldest_inserted() {
        let cache = PublicKeyCache::new(Duration::from_secs(600), 2);
        let start = Instant::now();
        cache.put_at(rsa("first"), key(), start);
        cache.put_at(rsa("second"), key(), start + Duration::from_secs(1));
        cache.put_at(rsa("third"), key(), start + Duration::from_secs(2));

        let now = start + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_at(&rsa("first"), now).is_none());
        assert!(cache.get_at(&rsa("second"), now).is_some());
        assert!(cache.get_at(&rsa("third"), now).is_some());
    }

    #[test]
    fn replacing_entry_does_not_evict() {
        let cache = PublicKeyCache::new(Duration::from_secs(600), 2);
        let start = Instant::now();
        cache.put_at(rsa("first"), key(), start);
        cache.put_at(rsa("second"), key(), start);
        cache.put_at(rsa("second"), key(), start + Duration::from_secs(1));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at(&rsa("first"), start).is_some());
    }

    #[test]
    fn cache_remove_and_clear() {
        let cache = PublicKeyCache::new(Duration::from_secs(60), 10);
        cache.put(rsa("a"), key());
        cache.put(rsa("b"), key());

        assert!(cache.remove(&rsa("a")));
        assert!(!cache.remove(&rsa("a")));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = std::sync::Arc::new(PublicKeyCache::new(Duration::from_secs(60), 100));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cache.put(rsa("shared"), key());
                        assert!(cache.get(&rsa("shared")).is_some());
                        cache.put(rsa(&format!("own-{i}")), key());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 9);
    }
}
