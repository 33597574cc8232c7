use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use health_sure_data::cache::{Cache, CacheError};
use health_sure_data::models::user::{NewUser, ProfileChanges, UserRow};
use health_sure_data::repository::{RepositoryError, UserRepository};

use crate::auth::logging::{
    log_account_deletion, log_failed_login, log_logout, log_otp_requested, log_otp_verification,
    log_password_change, log_password_reset, log_registration, log_successful_login, log_token_refresh,
};
use crate::auth::otp::{generate_otp, generate_reset_token};
use crate::auth::{
    Claims, IssuedTokens, PasswordHasher, SecurityError, SessionStore, TokenBlacklist, TokenManager,
    TokenType,
};
use crate::cache_keys;
use crate::entities::conversions::convert_to_domain_profile;
use crate::entities::user::normalize_email;
use crate::entities::validation::validate_input;
use crate::entities::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, OtpIssued, OtpRequest,
    RegisterRequest, ResetPasswordRequest, TokenPair, UpdateProfileRequest, UserProfile,
    ValidationFailure, VerifyOtpRequest,
};
use crate::notification::{send_quietly, EmailMessage, Mailer};

const INVALID_CREDENTIALS: &str = "Invalid Email or Password";

/// User service errors
#[derive(Debug, Error)]
pub enum UserServiceError {
    /// Input failed validation
    #[error("{0}")]
    Validation(ValidationFailure),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Well-formed request that cannot be honoured, e.g. a stale OTP
    #[error("{0}")]
    BadRequest(String),

    /// The session store could not be reached
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationFailure> for UserServiceError {
    fn from(failure: ValidationFailure) -> Self {
        UserServiceError::Validation(failure)
    }
}

impl From<CacheError> for UserServiceError {
    fn from(err: CacheError) -> Self {
        error!("Cache operation failed: {}", err);
        UserServiceError::CacheUnavailable(err.to_string())
    }
}

impl From<SecurityError> for UserServiceError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::Cache(e) => e.into(),
            SecurityError::TokenExpired => {
                UserServiceError::Unauthorized("Session expired - Please login again".to_string())
            }
            SecurityError::TokenRevoked => {
                UserServiceError::Unauthorized("Token has been revoked".to_string())
            }
            SecurityError::UserNotFound => {
                UserServiceError::Unauthorized("User no longer exists".to_string())
            }
            SecurityError::ConfigError(msg) => UserServiceError::Internal(msg),
            _ => UserServiceError::Unauthorized("Invalid refresh token".to_string()),
        }
    }
}

/// Settings that change user-facing behaviour
#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    /// Echo OTP codes in responses. Development only.
    pub expose_otp: bool,
    /// Frontend base URL used in password reset links
    pub app_url: String,
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            expose_otp: false,
            app_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Trait for account, session and credential operations
#[async_trait]
pub trait UserServiceTrait: Send + Sync {
    /// Create an account
    async fn register(&self, request: RegisterRequest) -> Result<UserProfile, UserServiceError>;

    /// Check credentials and open a session
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, UserServiceError>;

    /// Exchange the current refresh token for a new pair
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, UserServiceError>;

    /// Revoke the presented access token and end the refresh session
    async fn logout(&self, user_id: &str, access_claims: &Claims) -> Result<(), UserServiceError>;

    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, UserServiceError>;

    async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, UserServiceError>;

    async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> Result<(), UserServiceError>;

    /// Issue a one-time code for password recovery
    async fn request_otp(&self, request: OtpRequest) -> Result<OtpIssued, UserServiceError>;

    /// Redeem a one-time code and set a new password
    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<(), UserServiceError>;

    /// Mail a reset link. Succeeds whether or not the address is registered.
    async fn request_password_reset(&self, request: ForgotPasswordRequest) -> Result<(), UserServiceError>;

    async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), UserServiceError>;

    /// Delete the account and every health record section
    async fn delete_account(&self, user_id: &str) -> Result<(), UserServiceError>;
}

/// User service for domain logic
pub struct UserService {
    users: UserRepository,
    cache: Cache,
    tokens: Arc<TokenManager>,
    sessions: SessionStore,
    blacklist: TokenBlacklist,
    hasher: PasswordHasher,
    mailer: Arc<dyn Mailer>,
    config: UserServiceConfig,
}

impl UserService {
    pub fn new(
        users: UserRepository,
        cache: Cache,
        tokens: Arc<TokenManager>,
        mailer: Arc<dyn Mailer>,
        config: UserServiceConfig,
    ) -> Self {
        let sessions = SessionStore::new(cache.clone(), tokens.config().refresh_ttl);
        Self {
            users,
            blacklist: TokenBlacklist::new(cache.clone()),
            cache,
            tokens,
            sessions,
            hasher: PasswordHasher::new(),
            mailer,
            config,
        }
    }

    /// Map repository errors to service errors
    fn map_repo_error(&self, err: RepositoryError) -> UserServiceError {
        match err {
            RepositoryError::NotFound(msg) => UserServiceError::NotFound(msg),
            RepositoryError::Conflict(msg) => UserServiceError::Conflict(msg),
            _ => {
                error!("User repository failure: {}", err);
                UserServiceError::RepositoryError(err.to_string())
            }
        }
    }

    async fn require_user(&self, user_id: &str) -> Result<UserRow, UserServiceError> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| UserServiceError::NotFound("User not found".to_string()))
    }

    fn hash_password(&self, password: &str) -> Result<String, UserServiceError> {
        self.hasher.hash(password).map_err(|e| {
            error!("Password hashing failed: {}", e);
            UserServiceError::Internal("Failed to hash password".to_string())
        })
    }

    fn issue_tokens(&self, user_id: &str) -> Result<IssuedTokens, UserServiceError> {
        self.tokens.issue_pair(user_id).map_err(|e| {
            error!("Failed to issue tokens for user {}: {}", user_id, e);
            UserServiceError::Internal("Failed to issue tokens".to_string())
        })
    }

    /// False for a wrong password or an unreadable stored hash
    fn password_matches(&self, password: &str, user: &UserRow) -> bool {
        match self.hasher.verify(password, &user.password_hash) {
            Ok(matches) => matches,
            Err(e) => {
                error!("Stored password hash for user {} is unusable: {}", user.id, e);
                false
            }
        }
    }

    async fn cache_profile(&self, profile: &UserProfile) {
        if let Err(e) = self
            .cache
            .set(&cache_keys::user_profile(&profile.id), profile, cache_keys::PROFILE_TTL)
            .await
        {
            warn!("Failed to cache profile for user {}: {}", profile.id, e);
        }
    }

    /// Drop the cached profile and the refresh session after a credential change
    async fn invalidate_user_state(&self, user_id: &str) {
        if let Err(e) = self.cache.delete(&cache_keys::user_profile(user_id)).await {
            warn!("Failed to clear cached profile for user {}: {}", user_id, e);
        }
        if let Err(e) = self.sessions.end(user_id).await {
            warn!("Failed to end session for user {}: {}", user_id, e);
        }
    }

    async fn set_password(&self, user_id: &str, new_password: &str) -> Result<(), UserServiceError> {
        let hash = self.hash_password(new_password)?;
        let updated = self
            .users
            .update_password(user_id, hash)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        if !updated {
            return Err(UserServiceError::NotFound("User not found".to_string()));
        }
        self.invalidate_user_state(user_id).await;
        Ok(())
    }

    async fn discard_otp(&self, email: &str) {
        for key in [cache_keys::otp(email), cache_keys::otp_attempts(email)] {
            if let Err(e) = self.cache.delete(&key).await {
                warn!("Failed to delete {}: {}", key, e);
            }
        }
    }
}

#[async_trait]
impl UserServiceTrait for UserService {
    #[instrument(skip(self, request))]
    async fn register(&self, mut request: RegisterRequest) -> Result<UserProfile, UserServiceError> {
        request.email = request.email.map(|email| normalize_email(&email));
        request.full_name = request.full_name.map(|name| name.trim().to_string());
        validate_input(&request)?;

        let (Some(full_name), Some(email), Some(password)) =
            (request.full_name, request.email, request.password)
        else {
            return Err(ValidationFailure::message("Validation errors").into());
        };

        if self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .is_some()
        {
            debug!("Registration rejected, email already registered");
            return Err(UserServiceError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hash_password(&password)?;
        let row = self
            .users
            .create(NewUser {
                full_name,
                email,
                image: request.image,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    UserServiceError::Conflict("Email already registered".to_string())
                }
                other => self.map_repo_error(other),
            })?;

        log_registration(&row.id);
        Ok(convert_to_domain_profile(row))
    }

    #[instrument(skip(self, request))]
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, UserServiceError> {
        if let Err(failure) = validate_input(&request) {
            debug!("Login rejected before lookup: {}", failure.message);
            return Err(UserServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(UserServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };
        let email = normalize_email(&email);

        let Some(user) = self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| self.map_repo_error(e))?
        else {
            log_failed_login(&email, "unknown email");
            return Err(UserServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !self.password_matches(&password, &user) {
            log_failed_login(&email, "wrong password");
            return Err(UserServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let issued = self.issue_tokens(&user.id)?;
        self.sessions.start(&user.id, &issued.refresh_claims.jti).await?;

        send_quietly(self.mailer.as_ref(), EmailMessage::login_alert(&user.email, &user.full_name));
        log_successful_login(&user.id);

        Ok(LoginResponse::new(convert_to_domain_profile(user), issued.to_pair()))
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, UserServiceError> {
        let claims = match self.tokens.validate_token(refresh_token, TokenType::Refresh) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Refresh token rejected: {}", e);
                return Err(e.into());
            }
        };

        if self.blacklist.is_revoked(&claims.jti).await? {
            log_token_refresh(&claims.sub, false, Some("revoked refresh token"));
            return Err(SecurityError::TokenRevoked.into());
        }

        if !self.sessions.is_current(&claims.sub, &claims.jti).await? {
            log_token_refresh(&claims.sub, false, Some("refresh token is not the active session"));
            return Err(UserServiceError::Unauthorized("Invalid refresh token".to_string()));
        }

        if self
            .users
            .find_by_id(&claims.sub)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .is_none()
        {
            log_token_refresh(&claims.sub, false, Some("user no longer exists"));
            return Err(SecurityError::UserNotFound.into());
        }

        self.blacklist.revoke(&claims).await?;
        let issued = self.issue_tokens(&claims.sub)?;
        self.sessions.start(&claims.sub, &issued.refresh_claims.jti).await?;

        log_token_refresh(&claims.sub, true, None);
        Ok(issued.to_pair())
    }

    #[instrument(skip(self, access_claims))]
    async fn logout(&self, user_id: &str, access_claims: &Claims) -> Result<(), UserServiceError> {
        self.blacklist.revoke(access_claims).await?;
        self.sessions.end(user_id).await?;
        log_logout(user_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, UserServiceError> {
        match self.cache.get::<UserProfile>(&cache_keys::user_profile(user_id)).await {
            Ok(Some(profile)) => {
                debug!("Profile cache hit for user {}", user_id);
                return Ok(profile);
            }
            Ok(None) => debug!("Profile cache miss for user {}", user_id),
            Err(e) => warn!("Profile cache unavailable, reading from database: {}", e),
        }

        let profile = convert_to_domain_profile(self.require_user(user_id).await?);
        self.cache_profile(&profile).await;
        Ok(profile)
    }

    #[instrument(skip(self, request))]
    async fn update_profile(
        &self,
        user_id: &str,
        mut request: UpdateProfileRequest,
    ) -> Result<UserProfile, UserServiceError> {
        request.email = request.email.map(|email| normalize_email(&email));
        request.full_name = request.full_name.map(|name| name.trim().to_string());
        validate_input(&request)?;
        if request.is_empty() {
            return Err(ValidationFailure::message("No profile fields provided").into());
        }

        let current = self.require_user(user_id).await?;
        let new_email = request.email.clone().filter(|email| *email != current.email);

        if let Some(email) = &new_email {
            let taken = self
                .users
                .find_by_email(email)
                .await
                .map_err(|e| self.map_repo_error(e))?
                .is_some_and(|other| other.id != current.id);
            if taken {
                return Err(UserServiceError::Conflict("Email already in use".to_string()));
            }
        }

        let changes = ProfileChanges {
            full_name: request.full_name,
            email: request.email,
            image: request.image,
        };
        let row = self
            .users
            .update_profile(user_id, changes)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| UserServiceError::NotFound("User not found".to_string()))?;

        let profile = convert_to_domain_profile(row);
        self.cache_profile(&profile).await;

        if let Some(email) = new_email {
            info!("User {} changed their email address", user_id);
            send_quietly(self.mailer.as_ref(), EmailMessage::email_changed(&current.email, &email));
            send_quietly(
                self.mailer.as_ref(),
                EmailMessage::email_change_confirmation(&email, &profile.full_name),
            );
        }

        Ok(profile)
    }

    #[instrument(skip(self, request))]
    async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> Result<(), UserServiceError> {
        validate_input(&request)?;
        let user = self.require_user(user_id).await?;

        if !self.password_matches(&request.current_password, &user) {
            log_password_change(user_id, false, Some("current password mismatch"));
            return Err(UserServiceError::Unauthorized("Current password is incorrect".to_string()));
        }
        if request.new_password == request.current_password {
            return Err(ValidationFailure::message(
                "New password must be different from the current password",
            )
            .into());
        }

        self.set_password(user_id, &request.new_password).await?;
        send_quietly(
            self.mailer.as_ref(),
            EmailMessage::password_changed(&user.email, &user.full_name),
        );
        log_password_change(user_id, true, None);
        Ok(())
    }

    #[instrument(skip(self, request))]
    async fn request_otp(&self, request: OtpRequest) -> Result<OtpIssued, UserServiceError> {
        let email = normalize_email(&request.email);
        validate_input(&OtpRequest { email: email.clone() })?;

        if self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .is_none()
        {
            return Err(UserServiceError::NotFound("Email not found".to_string()));
        }

        let otp = generate_otp();
        self.cache
            .set(&cache_keys::otp(&email), &otp, cache_keys::OTP_TTL)
            .await?;
        self.cache.delete(&cache_keys::otp_attempts(&email)).await?;

        send_quietly(
            self.mailer.as_ref(),
            EmailMessage::otp_code(&email, &otp, cache_keys::OTP_TTL.as_secs() / 60),
        );
        log_otp_requested(&email);

        Ok(OtpIssued {
            email,
            expires_in: cache_keys::OTP_TTL.as_secs(),
            otp: self.config.expose_otp.then_some(otp),
        })
    }

    #[instrument(skip(self, request))]
    async fn verify_otp(&self, mut request: VerifyOtpRequest) -> Result<(), UserServiceError> {
        request.email = normalize_email(&request.email);
        validate_input(&request)?;
        let email = request.email;

        let Some(stored) = self.cache.get::<String>(&cache_keys::otp(&email)).await? else {
            log_otp_verification(&email, false, Some("expired or missing"));
            return Err(UserServiceError::BadRequest("OTP expired or not found".to_string()));
        };

        if stored != request.otp {
            let attempts_key = cache_keys::otp_attempts(&email);
            let attempts = self.cache.get::<u32>(&attempts_key).await?.unwrap_or(0) + 1;
            if attempts >= cache_keys::OTP_MAX_ATTEMPTS {
                warn!("OTP for {} discarded after {} failed attempts", email, attempts);
                self.discard_otp(&email).await;
            } else {
                self.cache
                    .set(&attempts_key, &attempts, cache_keys::OTP_TTL)
                    .await?;
            }
            log_otp_verification(&email, false, Some("code mismatch"));
            return Err(UserServiceError::BadRequest("Invalid OTP".to_string()));
        }

        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| UserServiceError::NotFound("Email not found".to_string()))?;

        self.set_password(&user.id, &request.new_password).await?;
        self.discard_otp(&email).await;

        send_quietly(
            self.mailer.as_ref(),
            EmailMessage::password_reset_confirmation(&user.email, &user.full_name),
        );
        log_otp_verification(&email, true, None);
        Ok(())
    }

    #[instrument(skip(self, request))]
    async fn request_password_reset(&self, request: ForgotPasswordRequest) -> Result<(), UserServiceError> {
        let email = normalize_email(&request.email);
        validate_input(&ForgotPasswordRequest { email: email.clone() })?;

        let Some(user) = self
            .users
            .find_by_email(&email)
            .await
            .map_err(|e| self.map_repo_error(e))?
        else {
            debug!("Password reset requested for an unregistered address");
            return Ok(());
        };

        let token = generate_reset_token();
        self.cache
            .set(&cache_keys::password_reset(&token), &user.id, cache_keys::PASSWORD_RESET_TTL)
            .await?;

        let link = format!(
            "{}/reset-password?token={}",
            self.config.app_url.trim_end_matches('/'),
            token
        );
        send_quietly(
            self.mailer.as_ref(),
            EmailMessage::password_reset_link(&user.email, &user.full_name, &link),
        );
        log_password_reset(&user.id, true, Some("reset link issued"));
        Ok(())
    }

    #[instrument(skip(self, request))]
    async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), UserServiceError> {
        validate_input(&request)?;
        let token_key = cache_keys::password_reset(&request.token);

        let invalid = || UserServiceError::BadRequest("Invalid or expired reset token".to_string());

        let Some(user_id) = self.cache.get::<String>(&token_key).await? else {
            log_password_reset("unknown", false, Some("invalid or expired token"));
            return Err(invalid());
        };
        let Some(user) = self
            .users
            .find_by_id(&user_id)
            .await
            .map_err(|e| self.map_repo_error(e))?
        else {
            self.cache.delete(&token_key).await?;
            return Err(invalid());
        };

        self.set_password(&user.id, &request.new_password).await?;
        self.cache.delete(&token_key).await?;

        send_quietly(
            self.mailer.as_ref(),
            EmailMessage::password_reset_confirmation(&user.email, &user.full_name),
        );
        log_password_reset(&user.id, true, None);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_account(&self, user_id: &str) -> Result<(), UserServiceError> {
        let deleted = self
            .users
            .delete(user_id)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        if !deleted {
            return Err(UserServiceError::NotFound("User not found".to_string()));
        }

        for key in [
            cache_keys::user_profile(user_id),
            cache_keys::user_tokens(user_id),
            cache_keys::health_record(user_id),
        ] {
            if let Err(e) = self.cache.delete(&key).await {
                warn!("Failed to delete {} after account deletion: {}", key, e);
            }
        }

        log_account_deletion(user_id);
        Ok(())
    }
}
