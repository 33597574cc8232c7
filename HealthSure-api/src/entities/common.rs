use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use health_sure_domain::entities::{FieldViolation, LoginResponse, OtpIssued, TokenPair, UserProfile};

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    ProfileResponse = ApiResponse<UserProfile>,
    LoginEnvelope = ApiResponse<LoginResponse>,
    TokenEnvelope = ApiResponse<TokenPair>,
    OtpEnvelope = ApiResponse<OtpIssued>
)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

/// Success response carrying only a message
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Standardized error response format
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Short error category, e.g. "Bad Request"
    pub error: String,

    /// Human readable explanation
    pub message: String,

    /// Per-field validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldViolation>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_skips_empty_fields() {
        let value = serde_json::to_value(ApiResponse::ok(42)).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "data": 42 }));

        let value = serde_json::to_value(ApiResponse::with_message("Done", "x")).unwrap();
        assert_eq!(value["message"], "Done");
    }
}
