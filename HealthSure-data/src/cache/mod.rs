//! Key/value cache used for profile caching, OTP storage, sessions and token revocation.
//!
//! Values are stored as JSON strings so the same facade works over the in-process
//! [`InMemoryCache`] and, with the `redis-cache` feature, over [`RedisCache`].

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

mod in_memory;
#[cfg(feature = "redis-cache")]
mod redis;

pub use in_memory::InMemoryCache;
#[cfg(feature = "redis-cache")]
pub use self::redis::RedisCache;

/// Default Redis location, matching a local development server
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// How often the in-process backend sweeps expired entries
const MEMORY_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend unavailable or misconfigured
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Stored value could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Poisoned in-process lock
    #[error("Cache lock error: {0}")]
    Lock(String),

    #[cfg(feature = "redis-cache")]
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Storage primitive implemented by each cache backend
#[async_trait]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    /// Fetch a live value
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl`
    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove a key; missing keys are not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Check the backend answers
    async fn ping(&self) -> Result<(), CacheError>;

    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;
}

/// Which backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub redis_url: String,
    /// TTL applied by [`Cache::set_default`]
    pub default_ttl: Duration,
    /// Capacity of the in-memory backend
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            default_ttl: Duration::from_secs(300),
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Create a cache configuration from environment variables
    pub fn from_env() -> Result<Self, CacheError> {
        let redis_url = env::var("REDIS_URL").ok();

        let backend = match env::var("CACHE_BACKEND") {
            Ok(kind) => match kind.to_lowercase().as_str() {
                "memory" => CacheBackendKind::Memory,
                "redis" => CacheBackendKind::Redis,
                other => {
                    return Err(CacheError::Backend(format!("Unsupported cache backend: {}", other)))
                }
            },
            Err(_) if redis_url.is_some() => CacheBackendKind::Redis,
            Err(_) => CacheBackendKind::Memory,
        };

        let default_ttl = env::var("REDIS_TTL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        let max_entries = env::var("CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(10_000);

        info!(
            "Cache configuration: backend={:?}, default_ttl={}s",
            backend,
            default_ttl.as_secs()
        );

        Ok(Self {
            backend,
            redis_url: redis_url.unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            default_ttl,
            max_entries,
        })
    }
}

/// JSON cache facade over a [`CacheBackend`]
#[derive(Debug, Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: Duration) -> Self {
        Self { backend, default_ttl }
    }

    /// In-process cache with default settings
    pub fn in_memory() -> Self {
        let config = CacheConfig::default();
        Self::new(
            Arc::new(InMemoryCache::with_max_entries(config.max_entries)),
            config.default_ttl,
        )
    }

    /// Build the backend selected by `config`
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendKind::Memory => {
                let cache = InMemoryCache::with_max_entries(config.max_entries);
                cache.spawn_cleanup_task(MEMORY_CLEANUP_INTERVAL);
                Arc::new(cache)
            }
            #[cfg(feature = "redis-cache")]
            CacheBackendKind::Redis => Arc::new(RedisCache::connect(&config.redis_url).await?),
            #[cfg(not(feature = "redis-cache"))]
            CacheBackendKind::Redis => {
                return Err(CacheError::Backend(
                    "Redis support is not compiled in (enable the redis-cache feature)".to_string(),
                ))
            }
        };
        info!("Cache backend ready: {}", backend.name());
        Ok(Self::new(backend, config.default_ttl))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Fetch and decode a value
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.backend.get_raw(key).await? {
            Some(raw) => {
                debug!("Cache hit: {}", key);
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => {
                debug!("Cache miss: {}", key);
                Ok(None)
            }
        }
    }

    /// Encode and store a value with an explicit TTL
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.backend.set_raw(key, raw, ttl).await
    }

    /// Encode and store a value with the configured default TTL
    pub async fn set_default<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set(key, value, self.default_ttl).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.backend.delete(key).await
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.backend.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        visits: u32,
    }

    #[tokio::test]
    async fn test_json_round_trip_and_delete() {
        let cache = Cache::in_memory();
        let profile = Profile { name: "Ada".into(), visits: 3 };

        cache.set_default("userProfile:1", &profile).await.unwrap();
        let cached: Option<Profile> = cache.get("userProfile:1").await.unwrap();
        assert_eq!(cached, Some(profile));

        cache.delete("userProfile:1").await.unwrap();
        let cached: Option<Profile> = cache.get("userProfile:1").await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_decode_mismatch_is_serialization_error() {
        let cache = Cache::in_memory();
        cache.set_default("otp:a@example.com", "123456").await.unwrap();

        let result: Result<Option<Profile>, _> = cache.get("otp:a@example.com").await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_default_config_uses_memory() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackendKind::Memory);
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
    }
}
