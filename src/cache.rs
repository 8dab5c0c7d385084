//! Read-through list cache keyed by domain key.
//!
//! Entries expire after the configured TTL and are dropped explicitly after
//! every successful mutation. There is no cross-process invalidation: another
//! writer's changes become visible when the TTL runs out.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::Result;

struct Entry<T> {
    items: Vec<T>,
    loaded_at: Instant,
}

pub struct DomainListCache<T> {
    name: &'static str,
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T: Clone> DomainListCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Check if the entry for `domain_key` needs a refresh (absent or TTL expired).
    pub fn needs_refresh(&self, domain_key: &str) -> bool {
        match self.entries.read().get(domain_key) {
            None => true,
            Some(entry) => entry.loaded_at.elapsed() >= self.ttl,
        }
    }

    /// Age of the entry in seconds.
    pub fn cache_age_secs(&self, domain_key: &str) -> Option<u64> {
        self.entries
            .read()
            .get(domain_key)
            .map(|e| e.loaded_at.elapsed().as_secs())
    }

    /// Cached list for `domain_key`, or the result of `load` when missing or
    /// stale. Load errors are returned and nothing is cached.
    pub fn get_or_load<F>(&self, domain_key: &str, load: F) -> Result<Vec<T>>
    where
        F: FnOnce() -> Result<Vec<T>>,
    {
        if !self.needs_refresh(domain_key) {
            if let Some(entry) = self.entries.read().get(domain_key) {
                log::debug!("CACHE_HIT cache={} domain={}", self.name, domain_key);
                return Ok(entry.items.clone());
            }
        }

        log::debug!("CACHE_MISS cache={} domain={}", self.name, domain_key);
        let items = load()?;
        self.entries.write().insert(
            domain_key.to_string(),
            Entry {
                items: items.clone(),
                loaded_at: Instant::now(),
            },
        );
        Ok(items)
    }

    pub fn invalidate(&self, domain_key: &str) {
        if self.entries.write().remove(domain_key).is_some() {
            log::debug!("CACHE_INVALIDATED cache={} domain={}", self.name, domain_key);
        }
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
