use std::env;
use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use health_sure_data::cache::CacheError;

use crate::auth::{Claims, TokenType};
use crate::entities::TokenPair;

/// Security errors for authentication and token operations
#[derive(Debug, Error)]
pub enum SecurityError {
    /// JWT validation error
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Expired token
    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// A refresh token used as an access token or the other way round
    #[error("Unexpected token type")]
    WrongTokenType,

    /// Token has been revoked
    #[error("Token has been revoked")]
    TokenRevoked,

    /// Token subject no longer exists
    #[error("User no longer exists")]
    UserNotFound,

    /// Configuration error
    #[error("Security configuration error: {0}")]
    ConfigError(String),

    /// Revocation or session lookup failed
    #[error("Session store error: {0}")]
    Cache(#[from] CacheError),
}

/// Default issuer claim
pub const DEFAULT_ISSUER: &str = "health-sure-api";

/// JWT settings
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC secret
    pub secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenConfig {
    /// Config with the given secret and default lifetimes
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            access_ttl: Duration::from_secs(120 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    /// Load JWT settings from environment variables. `JWT_SECRET` is required.
    pub fn from_env() -> Result<Self, SecurityError> {
        let secret = env::var("JWT_SECRET").map_err(|e| {
            error!("JWT_SECRET environment variable not found: {}", e);
            SecurityError::ConfigError("JWT_SECRET environment variable not found".to_string())
        })?;
        if secret.trim().is_empty() {
            return Err(SecurityError::ConfigError("JWT_SECRET must not be empty".to_string()));
        }

        let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string());

        let access_minutes = env::var("ACCESS_TOKEN_EXPIRATION_MINUTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(120);

        let refresh_days = env::var("REFRESH_TOKEN_EXPIRATION_DAYS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(7);

        info!(
            "Token configuration: issuer={}, access={}m, refresh={}d",
            issuer, access_minutes, refresh_days
        );

        Ok(Self {
            secret,
            issuer,
            access_ttl: Duration::from_secs(access_minutes * 60),
            refresh_ttl: Duration::from_secs(refresh_days * 24 * 60 * 60),
        })
    }

    fn ttl(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }
}

/// Freshly signed access and refresh tokens with their claims
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub access_claims: Claims,
    pub refresh_token: String,
    pub refresh_claims: Claims,
    pub expires_in: i64,
}

impl IssuedTokens {
    pub fn to_pair(&self) -> TokenPair {
        TokenPair {
            token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: self.expires_in,
        }
    }
}

/// Signs and validates HS256 JWTs
#[derive(Clone)]
pub struct TokenManager {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager").field("config", &self.config).finish()
    }
}

impl TokenManager {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Generate a new JWT token
    pub fn generate_token(
        &self,
        user_id: &str,
        token_type: TokenType,
    ) -> Result<(String, Claims), SecurityError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + self.config.ttl(token_type).as_secs() as i64,
            jti: Uuid::new_v4().to_string(),
            token_type,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to encode JWT token: {}", e);
            SecurityError::TokenValidation(e.to_string())
        })?;

        // Log token generation (but not the token itself)
        debug!("Generated {:?} token for user {} (exp {})", token_type, user_id, claims.exp);
        Ok((token, claims))
    }

    /// Issue an access and refresh token for the user
    pub fn issue_pair(&self, user_id: &str) -> Result<IssuedTokens, SecurityError> {
        let (access_token, access_claims) = self.generate_token(user_id, TokenType::Access)?;
        let (refresh_token, refresh_claims) = self.generate_token(user_id, TokenType::Refresh)?;
        info!("Issued token pair for user {}", user_id);

        Ok(IssuedTokens {
            access_token,
            access_claims,
            refresh_token,
            refresh_claims,
            expires_in: self.config.access_ttl.as_secs() as i64,
        })
    }

    /// Validate a JWT token and return the decoded claims
    pub fn validate_token(&self, token: &str, expected: TokenType) -> Result<Claims, SecurityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[self.config.issuer.as_str()]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    SecurityError::TokenValidation("Invalid signature".to_string())
                }
                _ => SecurityError::TokenValidation(e.to_string()),
            }
        })?;

        if token_data.claims.token_type != expected {
            debug!(
                "Rejected {:?} token where {:?} was expected",
                token_data.claims.token_type, expected
            );
            return Err(SecurityError::WrongTokenType);
        }

        Ok(token_data.claims)
    }
}
