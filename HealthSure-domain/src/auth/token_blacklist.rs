use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use health_sure_data::cache::Cache;

use crate::auth::token::SecurityError;
use crate::auth::Claims;
use crate::cache_keys;

/// Revoked JWTs, keyed by `jti` in the shared cache.
///
/// Each entry lives exactly as long as the token it revokes would have, so the
/// blacklist never outgrows the set of still-valid tokens.
#[derive(Debug, Clone)]
pub struct TokenBlacklist {
    cache: Cache,
}

impl TokenBlacklist {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Revoke the token described by `claims` for the rest of its lifetime
    pub async fn revoke(&self, claims: &Claims) -> Result<(), SecurityError> {
        let remaining = claims.exp - Utc::now().timestamp();
        if remaining <= 0 {
            debug!("Token {} already expired, nothing to revoke", claims.jti);
            return Ok(());
        }

        self.cache
            .set(
                &cache_keys::blacklist(&claims.jti),
                &true,
                Duration::from_secs(remaining as u64),
            )
            .await?;

        info!("Revoked {:?} token {} for user {}", claims.token_type, claims.jti, claims.sub);
        Ok(())
    }

    /// Check whether a token id has been revoked
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, SecurityError> {
        let revoked = self
            .cache
            .get::<bool>(&cache_keys::blacklist(jti))
            .await?
            .unwrap_or(false);
        debug!("Checking if token {} is revoked: {}", jti, revoked);
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenType;

    fn claims(jti: &str, exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: "user-1".to_string(),
            iss: "test".to_string(),
            iat: now,
            exp: now + exp_offset,
            jti: jti.to_string(),
            token_type: TokenType::Access,
        }
    }

    #[tokio::test]
    async fn test_revoke_and_check() {
        let blacklist = TokenBlacklist::new(Cache::in_memory());

        assert!(!blacklist.is_revoked("token-1").await.unwrap());
        blacklist.revoke(&claims("token-1", 3600)).await.unwrap();
        assert!(blacklist.is_revoked("token-1").await.unwrap());
        assert!(!blacklist.is_revoked("token-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_token_is_not_stored() {
        let cache = Cache::in_memory();
        let blacklist = TokenBlacklist::new(cache.clone());

        blacklist.revoke(&claims("old", -10)).await.unwrap();
        assert!(cache.get::<bool>("blacklist:old").await.unwrap().is_none());
    }
}
