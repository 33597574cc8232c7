//! Authentication module for HealthSure API
//!
//! JWT issuance and validation, revocation, refresh sessions, password hashing and the
//! middleware that guards protected routes.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use health_sure_data::cache::Cache;
use health_sure_data::repository::UserRepository;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::auth::logging::{log_auth_event, AuthEvent, AuthEventType};

// Token handling
pub mod token;

// Revoked tokens
pub mod token_blacklist;

// Refresh sessions
pub mod session;

// Password hashing
pub mod password;

// One-time codes and reset tokens
pub mod otp;

// Auth event logging
pub mod logging;

pub use password::{PasswordError, PasswordHasher};
pub use session::{ActiveSession, SessionStore};
pub use token::{IssuedTokens, SecurityError, TokenConfig, TokenManager};
pub use token_blacklist::TokenBlacklist;

/// Token types for authentication
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived access token
    Access,
    /// Long-lived refresh token
    Refresh,
}

/// Authentication claims for JSON Web Tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (as timestamp)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Unique token id, used for revocation
    pub jti: String,
    pub token_type: TokenType,
}

/// The caller of a protected route, inserted into request extensions
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub claims: Claims,
}

/// Resolves bearer tokens to users
#[derive(Debug, Clone)]
pub struct Authenticator {
    tokens: Arc<TokenManager>,
    blacklist: TokenBlacklist,
    users: UserRepository,
}

impl Authenticator {
    pub fn new(tokens: Arc<TokenManager>, cache: Cache, users: UserRepository) -> Self {
        Self {
            tokens,
            blacklist: TokenBlacklist::new(cache),
            users,
        }
    }

    /// Validate an access token, reject revoked ones, and load its user
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, SecurityError> {
        let claims = self.tokens.validate_token(token, TokenType::Access)?;

        if self.blacklist.is_revoked(&claims.jti).await? {
            return Err(SecurityError::TokenRevoked);
        }

        let user = self
            .users
            .find_by_id(&claims.sub)
            .await
            .map_err(|e| {
                warn!("User lookup failed during authentication: {}", e);
                SecurityError::TokenValidation("User lookup failed".to_string())
            })?
            .ok_or(SecurityError::UserNotFound)?;

        Ok(AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
            claims,
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Client-facing rejection for a failed authentication: 401 for missing, expired, revoked or
/// orphaned tokens, 503 when the revocation store is down, 403 otherwise.
pub fn rejection(error: &SecurityError) -> (u16, &'static str) {
    match error {
        SecurityError::TokenExpired => (401, "Session expired - Please login again"),
        SecurityError::TokenRevoked => (401, "Token has been revoked"),
        SecurityError::UserNotFound => (401, "User no longer exists"),
        SecurityError::Cache(_) => (503, "Authentication service temporarily unavailable"),
        _ => (403, "Not authorized - Invalid token"),
    }
}

/// Authentication middleware for protected routes
#[cfg(feature = "with-axum")]
pub async fn auth_middleware(
    axum::extract::State(authenticator): axum::extract::State<Arc<Authenticator>>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use axum::Json;

    let request_path = req.uri().path().to_string();
    let start_time = Instant::now();

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let Some(token) = bearer_token(header_value).map(str::to_owned) else {
        debug!("Missing bearer token on {}", request_path);
        log_auth_event(
            AuthEvent::new(AuthEventType::TokenValidation, None, false)
                .with_details("Missing bearer token")
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("jwt"),
        );
        let body = serde_json::json!({
            "success": false,
            "error": "Unauthorized",
            "message": "Unauthorized - No token provided",
        });
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    };

    match authenticator.authenticate(&token).await {
        Ok(user) => {
            log_auth_event(
                AuthEvent::new(AuthEventType::TokenValidation, Some(&user.user_id), true)
                    .with_resource(request_path)
                    .with_duration(start_time.elapsed().as_millis() as u64)
                    .with_auth_method("jwt"),
            );
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(e) => {
            let (status, message) = rejection(&e);
            log_auth_event(
                AuthEvent::new(AuthEventType::TokenValidation, None, false)
                    .with_details(e.to_string())
                    .with_resource(request_path)
                    .with_duration(start_time.elapsed().as_millis() as u64)
                    .with_auth_method("jwt"),
            );
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::FORBIDDEN);
            let body = serde_json::json!({
                "success": false,
                "error": status.canonical_reason().unwrap_or("Forbidden"),
                "message": message,
            });
            (status, Json(body)).into_response()
        }
    }
}

#[cfg(feature = "with-axum")]
#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (axum::http::StatusCode, axum::Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthenticatedUser>().cloned().ok_or_else(|| {
            (
                axum::http::StatusCode::UNAUTHORIZED,
                axum::Json(serde_json::json!({
                    "success": false,
                    "error": "Unauthorized",
                    "message": "Unauthorized - No token provided",
                })),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use health_sure_data::database::DatabasePool;
    use health_sure_data::models::user::NewUser;

    async fn setup() -> (Authenticator, Arc<TokenManager>, UserRepository, Cache) {
        let pool = DatabasePool::in_memory().unwrap();
        let users = UserRepository::new(pool);
        let cache = Cache::in_memory();
        let tokens = Arc::new(TokenManager::new(TokenConfig::new("middleware-test-secret")));
        let authenticator = Authenticator::new(tokens.clone(), cache.clone(), users.clone());
        (authenticator, tokens, users, cache)
    }

    async fn create_user(users: &UserRepository) -> String {
        users
            .create(NewUser {
                full_name: "Ada Lovelace".into(),
                email: "ada@example.com".into(),
                image: None,
                password_hash: "hash".into(),
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(rejection(&SecurityError::TokenExpired), (401, "Session expired - Please login again"));
        assert_eq!(rejection(&SecurityError::TokenRevoked), (401, "Token has been revoked"));
        assert_eq!(rejection(&SecurityError::UserNotFound), (401, "User no longer exists"));
        assert_eq!(rejection(&SecurityError::InvalidToken), (403, "Not authorized - Invalid token"));
        assert_eq!(rejection(&SecurityError::WrongTokenType), (403, "Not authorized - Invalid token"));
    }

    #[tokio::test]
    async fn test_authenticate_valid_token() {
        let (authenticator, tokens, users, _) = setup().await;
        let user_id = create_user(&users).await;
        let pair = tokens.issue_pair(&user_id).unwrap();

        let user = authenticator.authenticate(&pair.access_token).await.unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.claims.jti, pair.access_claims.jti);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_refresh_token() {
        let (authenticator, tokens, users, _) = setup().await;
        let user_id = create_user(&users).await;
        let pair = tokens.issue_pair(&user_id).unwrap();

        let err = authenticator.authenticate(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, SecurityError::WrongTokenType));
    }

    #[tokio::test]
    async fn test_authenticate_revoked_token() {
        let (authenticator, tokens, users, cache) = setup().await;
        let user_id = create_user(&users).await;
        let pair = tokens.issue_pair(&user_id).unwrap();

        TokenBlacklist::new(cache).revoke(&pair.access_claims).await.unwrap();

        let err = authenticator.authenticate(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, SecurityError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_authenticate_deleted_user() {
        let (authenticator, tokens, users, _) = setup().await;
        let user_id = create_user(&users).await;
        let pair = tokens.issue_pair(&user_id).unwrap();
        users.delete(&user_id).await.unwrap();

        let err = authenticator.authenticate(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, SecurityError::UserNotFound));
    }
}
