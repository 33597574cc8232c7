use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of authentication events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEventType {
    /// User login attempt
    Login,
    /// Failed login attempt
    FailedLogin,
    /// User logout
    Logout,
    /// User registration
    Registration,
    /// Token refresh
    TokenRefresh,
    /// Token revocation
    TokenRevocation,
    /// Token validation in the middleware
    TokenValidation,
    /// Password changed by its owner
    PasswordChange,
    /// OTP issued for a password reset
    OtpRequested,
    /// OTP checked
    OtpVerification,
    /// Password reset link requested or used
    PasswordReset,
    /// Access denied to resource
    AccessDenied,
    /// Account deleted
    AccountDeletion,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::Login => write!(f, "LOGIN"),
            AuthEventType::FailedLogin => write!(f, "FAILED_LOGIN"),
            AuthEventType::Logout => write!(f, "LOGOUT"),
            AuthEventType::Registration => write!(f, "REGISTRATION"),
            AuthEventType::TokenRefresh => write!(f, "TOKEN_REFRESH"),
            AuthEventType::TokenRevocation => write!(f, "TOKEN_REVOCATION"),
            AuthEventType::TokenValidation => write!(f, "TOKEN_VALIDATION"),
            AuthEventType::PasswordChange => write!(f, "PASSWORD_CHANGE"),
            AuthEventType::OtpRequested => write!(f, "OTP_REQUESTED"),
            AuthEventType::OtpVerification => write!(f, "OTP_VERIFICATION"),
            AuthEventType::PasswordReset => write!(f, "PASSWORD_RESET"),
            AuthEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
            AuthEventType::AccountDeletion => write!(f, "ACCOUNT_DELETION"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub event_type: AuthEventType,
    /// User ID or email, when known
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: Option<String>,
    /// The resource being accessed (if applicable)
    pub resource: Option<String>,
    /// Duration of the operation in milliseconds (if applicable)
    pub duration_ms: Option<u64>,
    /// Authentication method used (password, jwt, otp)
    pub auth_method: Option<String>,
}

impl AuthEvent {
    /// Create a new authentication event
    pub fn new(event_type: AuthEventType, user_id: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
            duration_ms: None,
            auth_method: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }
}

/// Log an authentication event
pub fn log_auth_event(event: AuthEvent) {
    let user_id_str = event.user_id.as_deref().unwrap_or("anonymous");
    let status = if event.success { "SUCCESS" } else { "FAILURE" };
    let details = event.details.as_deref().unwrap_or("");
    let resource = event.resource.as_deref().unwrap_or("-");

    if event.success {
        info!(
            "AUTH-LOG [{}] [{}] [{}] [{}] [{}] {}",
            event.event_type,
            user_id_str,
            status,
            event.timestamp.to_rfc3339(),
            resource,
            details
        );
    } else {
        warn!(
            "AUTH-LOG [{}] [{}] [{}] [{}] [{}] {}",
            event.event_type,
            user_id_str,
            status,
            event.timestamp.to_rfc3339(),
            resource,
            details
        );
    }
}

pub fn log_registration(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Registration, Some(user_id), true));
}

pub fn log_successful_login(user_id: &str) {
    let event = AuthEvent::new(AuthEventType::Login, Some(user_id), true).with_auth_method("password");
    log_auth_event(event);
}

/// Log a failed login attempt
pub fn log_failed_login(email: &str, reason: &str) {
    let event = AuthEvent::new(AuthEventType::FailedLogin, Some(email), false)
        .with_details(reason)
        .with_auth_method("password");
    log_auth_event(event);
}

pub fn log_token_refresh(user_id: &str, success: bool, details: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::TokenRefresh, Some(user_id), success);
    if let Some(d) = details {
        event = event.with_details(d);
    }
    log_auth_event(event);
}

pub fn log_logout(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::Logout, Some(user_id), true));
}

pub fn log_token_revocation(user_id: &str, reason: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::TokenRevocation, Some(user_id), true);
    if let Some(r) = reason {
        event = event.with_details(r);
    }
    log_auth_event(event);
}

pub fn log_password_change(user_id: &str, success: bool, details: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::PasswordChange, Some(user_id), success);
    if let Some(d) = details {
        event = event.with_details(d);
    }
    log_auth_event(event);
}

pub fn log_otp_requested(email: &str) {
    let event = AuthEvent::new(AuthEventType::OtpRequested, Some(email), true).with_auth_method("otp");
    log_auth_event(event);
}

pub fn log_otp_verification(email: &str, success: bool, details: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::OtpVerification, Some(email), success)
        .with_auth_method("otp");
    if let Some(d) = details {
        event = event.with_details(d);
    }
    log_auth_event(event);
}

pub fn log_password_reset(subject: &str, success: bool, details: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::PasswordReset, Some(subject), success);
    if let Some(d) = details {
        event = event.with_details(d);
    }
    log_auth_event(event);
}

/// Log an access denied event
pub fn log_access_denied(user_id: &str, resource: &str, reason: &str) {
    let event = AuthEvent::new(AuthEventType::AccessDenied, Some(user_id), false)
        .with_resource(resource)
        .with_details(reason);
    log_auth_event(event);
}

pub fn log_account_deletion(user_id: &str) {
    log_auth_event(AuthEvent::new(AuthEventType::AccountDeletion, Some(user_id), true));
}
