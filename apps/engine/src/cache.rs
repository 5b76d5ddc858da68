//! Content-addressable result cache.
//!
//! Keys are derived from a sha256 of the input content, namespaced per use
//! site, with a fixed TTL. Parse results for identical JD/resume text are
//! served from here instead of re-calling the model.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct CacheEntry {
    value: Value,
    inserted_at: Instant,
}

/// In-memory cache with content-hash keys and a fixed TTL.
pub struct ContentCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `(namespace, content)` if present, not
    /// expired, and decodable as `T`. Expired entries are evicted on read.
    pub fn get<T: DeserializeOwned>(&self, namespace: &str, content: &str) -> Option<T> {
        let key = cache_key(namespace, content);
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                serde_json::from_value(entry.value.clone()).ok()
            }
            Some(_) => {
                debug!(namespace, "evicting expired cache entry");
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, namespace: &str, content: &str, value: Value) {
        let key = cache_key(namespace, content);
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(
                key,
                CacheEntry {
                    value,
                    inserted_at: Instant::now(),
                },
            );
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(namespace: &str, content: &str) -> String {
    format!("{namespace}:{}", hex::encode(Sha256::digest(content.as_bytes())))
}
