use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CacheBackend, CacheError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
    inserted_at: Instant,
}

/// In-process TTL cache.
///
/// Expired entries are never returned and are dropped lazily on access, on
/// [`InMemoryCache::purge_expired`], or by the task from
/// [`InMemoryCache::spawn_cleanup_task`]. When `max_entries` is reached, expired entries
/// are purged first and then the oldest half is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    max_entries: usize,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    /// Create a cache holding up to 10,000 entries
    pub fn new() -> Self {
        Self::with_max_entries(10_000)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries.lock().map_err(|e| CacheError::Lock(e.to_string()))
    }

    /// Number of stored entries, including ones that expired but were not yet purged
    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let mut entries = self.lock()?;
        Ok(purge_expired_locked(&mut entries))
    }

    /// Periodically purge expired entries on the tokio runtime
    pub fn spawn_cleanup_task(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match cache.purge_expired() {
                    Ok(removed) => debug!("Cache cleanup removed {} expired entries", removed),
                    Err(e) => warn!("Cache cleanup failed: {}", e),
                }
            }
        })
    }
}

fn purge_expired_locked(entries: &mut HashMap<String, Entry>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

fn remove_oldest(entries: &mut HashMap<String, Entry>, count: usize) {
    let mut by_age: Vec<(String, Instant)> = entries
        .iter()
        .map(|(key, entry)| (key.clone(), entry.inserted_at))
        .collect();
    by_age.sort_by(|a, b| a.1.cmp(&b.1));

    for (key, _) in by_age.into_iter().take(count) {
        entries.remove(&key);
    }
    debug!("Removed {} oldest cache entries", count);
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.lock()?;

        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            warn!("Cache reached max size ({}), pruning", self.max_entries);
            purge_expired_locked(&mut entries);
            if entries.len() >= self.max_entries {
                let count = (self.max_entries / 2).max(1);
                remove_oldest(&mut entries, count);
            }
        }

        let now = Instant::now();
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
                inserted_at: now,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.lock().map(|_| ())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
