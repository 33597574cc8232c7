//! Cache key layout shared by the services.

use std::time::Duration;

/// Cached profiles live for an hour
pub const PROFILE_TTL: Duration = Duration::from_secs(3600);

/// OTP codes expire after five minutes
pub const OTP_TTL: Duration = Duration::from_secs(300);

/// Wrong guesses allowed before an OTP is discarded
pub const OTP_MAX_ATTEMPTS: u32 = 5;

/// Password reset links stay valid for an hour
pub const PASSWORD_RESET_TTL: Duration = Duration::from_secs(3600);

pub fn user_profile(user_id: &str) -> String {
    format!("userProfile:{}", user_id)
}

/// Active refresh session of a user
pub fn user_tokens(user_id: &str) -> String {
    format!("userTokens:{}", user_id)
}

/// Revoked token, keyed by JWT id
pub fn blacklist(jti: &str) -> String {
    format!("blacklist:{}", jti)
}

pub fn otp(email: &str) -> String {
    format!("otp:{}", email)
}

pub fn otp_attempts(email: &str) -> String {
    format!("otpAttempts:{}", email)
}

pub fn password_reset(token: &str) -> String {
    format!("passwordReset:{}", token)
}

pub fn health_record(user_id: &str) -> String {
    format!("healthRecord:{}", user_id)
}
