use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use health_sure_data::cache::Cache;

use crate::auth::token::SecurityError;
use crate::cache_keys;

/// The refresh token currently allowed to renew a user's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub refresh_jti: String,
    pub issued_at: DateTime<Utc>,
}

/// One active refresh session per user, stored under `userTokens:{userId}`
#[derive(Debug, Clone)]
pub struct SessionStore {
    cache: Cache,
    ttl: Duration,
}

impl SessionStore {
    /// `ttl` should match the refresh token lifetime
    pub fn new(cache: Cache, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Record `refresh_jti` as the user's current session, replacing any previous one
    pub async fn start(&self, user_id: &str, refresh_jti: &str) -> Result<(), SecurityError> {
        let session = ActiveSession {
            refresh_jti: refresh_jti.to_string(),
            issued_at: Utc::now(),
        };
        self.cache
            .set(&cache_keys::user_tokens(user_id), &session, self.ttl)
            .await?;
        debug!("Started session for user {}", user_id);
        Ok(())
    }

    pub async fn current(&self, user_id: &str) -> Result<Option<ActiveSession>, SecurityError> {
        Ok(self.cache.get(&cache_keys::user_tokens(user_id)).await?)
    }

    /// True when `refresh_jti` is the refresh token recorded for the user
    pub async fn is_current(&self, user_id: &str, refresh_jti: &str) -> Result<bool, SecurityError> {
        Ok(self
            .current(user_id)
            .await?
            .map_or(false, |session| session.refresh_jti == refresh_jti))
    }

    pub async fn end(&self, user_id: &str) -> Result<(), SecurityError> {
        self.cache.delete(&cache_keys::user_tokens(user_id)).await?;
        debug!("Ended session for user {}", user_id);
        Ok(())
    }
}
