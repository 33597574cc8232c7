use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, instrument};

use health_sure_domain::auth::AuthenticatedUser;
use health_sure_domain::entities::validation::validate_input;
use health_sure_domain::entities::{
    ForgotPasswordRequest, LoginRequest, OtpRequest, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, VerifyOtpRequest,
};

use crate::api::error::{ApiError, JsonBody};
use crate::entities::{ApiResponse, MessageResponse};
use crate::state::AppState;

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = crate::entities::ProfileResponse),
        (status = 400, description = "Validation failed", body = crate::entities::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::entities::ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn sign_up(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.users.register(request).await?;
    info!("Registered user {}", profile.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("User registered successfully", profile)),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/log-in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::entities::LoginEnvelope),
        (status = 401, description = "Invalid Email or Password", body = crate::entities::ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn log_in(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.users.login(request).await?;
    Ok(Json(ApiResponse::with_message("Login successful", response)))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = crate::entities::TokenEnvelope),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = crate::entities::ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&request)?;
    let tokens = state.users.refresh(&request.refresh_token).await?;
    Ok(Json(ApiResponse::with_message("Token refreshed successfully", tokens)))
}

/// Revoke the current access token and end the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = crate::entities::MessageResponse),
        (status = 401, description = "Not authenticated", body = crate::entities::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Authentication"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    state.users.logout(&user.user_id, &user.claims).await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// Send a one-time password to a registered email
#[utoipa::path(
    post,
    path = "/auth/request-otp",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = crate::entities::OtpEnvelope),
        (status = 404, description = "Email not found", body = crate::entities::ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn request_otp(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<OtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state.users.request_otp(request).await?;
    Ok(Json(ApiResponse::with_message("OTP sent to email", issued)))
}

/// Verify a one-time password and set a new password
#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Password reset", body = crate::entities::MessageResponse),
        (status = 400, description = "Invalid or expired OTP", body = crate::entities::ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn verify_otp(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.users.verify_otp(request).await?;
    Ok(Json(MessageResponse::new("Password reset successfully")))
}

/// Email a password reset link
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent if the email is registered", body = crate::entities::MessageResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.users.request_password_reset(request).await?;
    Ok(Json(MessageResponse::new(
        "If that email is registered, a password reset link has been sent",
    )))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = crate::entities::MessageResponse),
        (status = 400, description = "Invalid or expired reset token", body = crate::entities::ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, request))]
pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.users.reset_password(request).await?;
    Ok(Json(MessageResponse::new("Password reset successfully")))
}
