use axum::extract::OriginalUri;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use tracing::debug;

use health_sure_domain::auth::auth_middleware;

use crate::api::handlers::{auth, health, health_record, profile};
use crate::openapi::configure_swagger_routes;
use crate::state::AppState;

/// Build the router: public auth and health routes, JWT-guarded profile and dashboard routes
pub fn create_router(state: AppState) -> Router {
    debug!("Creating application router");
    health::initialize_server_start_time();

    let public_routes = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/log-in", post(auth::log_in))
        .route("/auth/refresh-token", post(auth::refresh_token))
        .route("/auth/request-otp", post(auth::request_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route(
            "/auth/profile",
            get(profile::get_profile)
                .put(profile::update_profile)
                .delete(profile::delete_profile),
        )
        .route("/auth/change-password", post(profile::change_password))
        .route(
            "/dashboard/:userId/manage-health",
            get(health_record::get_health_record),
        )
        .route(
            "/dashboard/:userId/manage-health/:section",
            get(health_record::get_section).post(health_record::upsert_section),
        )
        .layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(route_not_found)
        .with_state(state)
        .merge(configure_swagger_routes())
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    debug!("No route for {}", uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Route not found",
            "path": uri.path(),
        })),
    )
}
