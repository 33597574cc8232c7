//! Error responses for the HTTP layer

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, warn};

use health_sure_domain::entities::{FieldViolation, ValidationFailure};
use health_sure_domain::services::{HealthRecordServiceError, UserServiceError};

use crate::entities::ErrorResponse;

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldViolation>,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    /// Details are logged, never returned
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = status.canonical_reason().unwrap_or("Error").to_string();

        let body = match self {
            ApiError::Validation { message, errors } => ErrorResponse {
                success: false,
                error,
                message,
                errors: (!errors.is_empty()).then_some(errors),
            },
            ApiError::Internal(details) => {
                error!("Internal server error: {}", details);
                ErrorResponse {
                    success: false,
                    error,
                    message: "Internal server error".to_string(),
                    errors: None,
                }
            }
            ApiError::ServiceUnavailable(details) => {
                warn!("Service unavailable: {}", details);
                ErrorResponse {
                    success: false,
                    error,
                    message: "Service temporarily unavailable, please try again later".to_string(),
                    errors: None,
                }
            }
            other => ErrorResponse {
                success: false,
                error,
                message: other.to_string(),
                errors: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        ApiError::Validation {
            message: failure.message,
            errors: failure.errors,
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Validation(failure) => failure.into(),
            UserServiceError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            UserServiceError::NotFound(msg) => ApiError::NotFound(msg),
            UserServiceError::Conflict(msg) => ApiError::Conflict(msg),
            UserServiceError::BadRequest(msg) => ApiError::BadRequest(msg),
            UserServiceError::CacheUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            UserServiceError::RepositoryError(msg) | UserServiceError::Internal(msg) => {
                ApiError::Internal(msg)
            }
        }
    }
}

impl From<HealthRecordServiceError> for ApiError {
    fn from(err: HealthRecordServiceError) -> Self {
        match err {
            HealthRecordServiceError::Validation(failure) => failure.into(),
            HealthRecordServiceError::NotFound(msg) => ApiError::NotFound(msg),
            HealthRecordServiceError::RepositoryError(msg) | HealthRecordServiceError::Conversion(msg) => {
                ApiError::Internal(msg)
            }
        }
    }
}

/// JSON body extractor whose rejections use the API error format.
///
/// The body is first read as a JSON value, so type errors come back as the plain
/// deserializer message (e.g. "testResults must be an array") without byte positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        serde_json::from_value(value)
            .map(JsonBody)
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}
