use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use tracing::{debug, instrument};

use health_sure_domain::auth::logging::log_access_denied;
use health_sure_domain::auth::AuthenticatedUser;
use health_sure_domain::entities::{SectionKind, SectionPayload};

use crate::api::error::{ApiError, JsonBody};
use crate::entities::ApiResponse;
use crate::state::AppState;

/// Health records may only be read and written by their owner
fn ensure_owner(user: &AuthenticatedUser, user_id: &str, resource: &str) -> Result<(), ApiError> {
    if user.user_id == user_id {
        return Ok(());
    }
    log_access_denied(&user.user_id, resource, "health record belongs to another user");
    Err(ApiError::Forbidden(
        "Not authorized to access this health record".to_string(),
    ))
}

fn section_kind(segment: &str) -> Result<SectionKind, ApiError> {
    SectionKind::from_path_segment(segment)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown health record section: {}", segment)))
}

/// Every section of the user's health record
#[utoipa::path(
    get,
    path = "/dashboard/{userId}/manage-health",
    params(("userId" = String, Path, description = "Owner of the health record")),
    responses(
        (status = 200, description = "Health record; unwritten sections are null", body = serde_json::Value),
        (status = 403, description = "Record belongs to another user", body = crate::entities::ErrorResponse),
        (status = 404, description = "User not found", body = crate::entities::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Health Records"
)]
#[instrument(skip(state, user))]
pub async fn get_health_record(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_owner(&user, &user_id, "manage-health")?;
    let record = state.health_records.get_health_record(&user_id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// One section of the user's health record
#[utoipa::path(
    get,
    path = "/dashboard/{userId}/manage-health/{section}",
    params(
        ("userId" = String, Path, description = "Owner of the health record"),
        ("section" = String, Path, description = "basic-info, health-status, medical-history, treatment-info, lab-results or notes")
    ),
    responses(
        (status = 200, description = "Section found", body = serde_json::Value),
        (status = 403, description = "Record belongs to another user", body = crate::entities::ErrorResponse),
        (status = 404, description = "Section not written yet", body = crate::entities::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Health Records"
)]
#[instrument(skip(state, user))]
pub async fn get_section(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((user_id, segment)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = section_kind(&segment)?;
    ensure_owner(&user, &user_id, kind.path_segment())?;

    let record = state
        .health_records
        .get_section(&user_id, kind)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} not found", kind.label())))?;
    Ok(Json(ApiResponse::ok(record)))
}

/// Create the section, or replace it if it already exists
#[utoipa::path(
    post,
    path = "/dashboard/{userId}/manage-health/{section}",
    params(
        ("userId" = String, Path, description = "Owner of the health record"),
        ("section" = String, Path, description = "basic-info, health-status, medical-history, treatment-info, lab-results or notes")
    ),
    request_body(content = serde_json::Value, description = "BasicInfo, HealthStatus, MedicalHistory, TreatmentInfo, LabResult or Note, matching the section"),
    responses(
        (status = 200, description = "Section created or updated", body = serde_json::Value),
        (status = 400, description = "Validation failed", body = crate::entities::ErrorResponse),
        (status = 403, description = "Record belongs to another user", body = crate::entities::ErrorResponse),
        (status = 404, description = "User not found", body = crate::entities::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Health Records"
)]
#[instrument(skip(state, user, body))]
pub async fn upsert_section(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((user_id, segment)): Path<(String, String)>,
    JsonBody(body): JsonBody<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = section_kind(&segment)?;
    ensure_owner(&user, &user_id, kind.path_segment())?;

    let payload = SectionPayload::from_value(kind, body).map_err(|e| {
        debug!("Rejected {} body: {}", kind, e);
        ApiError::BadRequest(e.to_string())
    })?;

    let outcome = state.health_records.upsert_section(&user_id, payload).await?;
    Ok(Json(ApiResponse::with_message(outcome.message(), outcome.record)))
}
