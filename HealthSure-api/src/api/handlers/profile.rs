use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, instrument};

use health_sure_domain::auth::AuthenticatedUser;
use health_sure_domain::entities::{ChangePasswordRequest, UpdateProfileRequest};

use crate::api::error::{ApiError, JsonBody};
use crate::entities::{ApiResponse, MessageResponse};
use crate::state::AppState;

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Current profile", body = crate::entities::ProfileResponse),
        (status = 401, description = "Not authenticated", body = crate::entities::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Profile"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.users.get_profile(&user.user_id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// Update name, email or image
#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = crate::entities::ProfileResponse),
        (status = 400, description = "Validation failed", body = crate::entities::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::entities::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Profile"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(request): JsonBody<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.users.update_profile(&user.user_id, request).await?;
    Ok(Json(ApiResponse::with_message("Profile updated successfully", profile)))
}

/// Delete the account and all health records
#[utoipa::path(
    delete,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Account deleted", body = crate::entities::MessageResponse),
        (status = 404, description = "User not found", body = crate::entities::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Profile"
)]
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    state.users.delete_account(&user.user_id).await?;
    info!("Account {} deleted", user.user_id);
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

/// Change password after confirming the current one
#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = crate::entities::MessageResponse),
        (status = 401, description = "Current password is incorrect", body = crate::entities::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Profile"
)]
#[instrument(skip(state, user, request), fields(user_id = %user.user_id))]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(request): JsonBody<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.users.change_password(&user.user_id, request).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}
