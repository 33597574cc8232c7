use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Public view of a user account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    /// Profile image URL
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sign-up body
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        required(message = "fullName is required"),
        length(min = 3, message = "fullName must be at least 3 characters long")
    )]
    pub full_name: Option<String>,

    #[validate(
        required(message = "Email is required"),
        email(message = "Invalid email format")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters long")
    )]
    pub password: Option<String>,

    #[validate(url(message = "image must be a valid URL"))]
    pub image: Option<String>,
}

/// Credentials for `/auth/log-in`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LoginRequest {
    #[validate(
        required(message = "Invalid Email or Password"),
        email(message = "Invalid Email or Password")
    )]
    pub email: Option<String>,

    #[validate(required(message = "Invalid Email or Password"))]
    pub password: Option<String>,
}

/// Issued access and refresh tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub image: Option<String>,
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl LoginResponse {
    pub fn new(profile: UserProfile, tokens: TokenPair) -> Self {
        Self {
            user_id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            image: profile.image,
            token: tokens.token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Partial profile update; omitted fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, message = "fullName must be at least 3 characters long"))]
    pub full_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(url(message = "image must be a valid URL"))]
    pub image: Option<String>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "New password must be at least 8 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct OtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Result of an OTP request. The code is only echoed outside production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OtpIssued {
    pub email: String,
    /// Seconds until the code expires
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,

    #[validate(length(min = 8, message = "New password must be at least 8 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,

    #[validate(length(min = 8, message = "New password must be at least 8 characters long"))]
    pub new_password: String,
}

/// Normalise an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::validation::validate_input;

    #[test]
    fn test_register_reports_each_missing_field() {
        let failure = validate_input(&RegisterRequest::default()).unwrap_err();
        let messages: Vec<&str> = failure.errors.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Email is required", "fullName is required", "Password is required"]
        );
    }

    #[test]
    fn test_register_rules() {
        let request = RegisterRequest {
            full_name: Some("Al".into()),
            email: Some("not-an-email".into()),
            password: Some("12345".into()),
            image: None,
        };
        let failure = validate_input(&request).unwrap_err();
        let fields: Vec<&str> = failure.errors.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "fullName", "password"]);
    }

    #[test]
    fn test_login_messages_do_not_leak_which_field() {
        let request = LoginRequest {
            email: Some("bad".into()),
            password: None,
        };
        let failure = validate_input(&request).unwrap_err();
        assert!(failure.errors.iter().all(|v| v.message == "Invalid Email or Password"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_otp_issued_hides_code_when_absent() {
        let issued = OtpIssued {
            email: "a@example.com".into(),
            expires_in: 300,
            otp: None,
        };
        let value = serde_json::to_value(issued).unwrap();
        assert!(value.get("otp").is_none());
        assert_eq!(value["expiresIn"], 300);
    }
}
