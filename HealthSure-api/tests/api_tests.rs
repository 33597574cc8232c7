use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use health_sure_api::api::create_application;
use health_sure_api::config::app_environment;
use health_sure_api::{AppConfig, AppState};
use health_sure_data::cache::Cache;
use health_sure_data::database::DatabasePool;
use health_sure_domain::notification::LogMailer;

fn test_app() -> Router {
    app_with_config(AppConfig::in_memory("api-test-secret"))
}

fn app_with_config(config: AppConfig) -> Router {
    let pool = DatabasePool::in_memory().unwrap();
    let state = AppState::from_parts(pool, Cache::in_memory(), &config, Arc::new(LogMailer));
    create_application(state, &config)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn sign_up_and_log_in(app: &Router, email: &str) -> (String, String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/sign-up",
        None,
        Some(json!({"fullName": "Ada Lovelace", "email": email, "password": "secret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "sign-up failed: {}", body);

    let (status, body) = send(
        app,
        Method::POST,
        "/auth/log-in",
        None,
        Some(json!({"email": email, "password": "secret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    let data = &body["data"];
    (
        data["userId"].as_str().unwrap().to_string(),
        data["token"].as_str().unwrap().to_string(),
        data["refreshToken"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_root_and_health() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["database"]["status"], "ok");
    assert_eq!(body["components"]["cache"]["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/no/such/route", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Route not found");
    assert_eq!(body["path"], "/no/such/route");
}

#[tokio::test]
async fn test_sign_up_returns_profile_without_password() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/sign-up",
        None,
        Some(json!({"fullName": "Grace Hopper", "email": "Grace@Example.com", "password": "secret-pass"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["data"]["email"], "grace@example.com");
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_sign_up_validation_and_conflict() {
    let app = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/sign-up",
        None,
        Some(json!({"fullName": "Al", "email": "not-an-email"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["errors"].as_array().map_or(false, |e| !e.is_empty()));

    sign_up_and_log_in(&app, "dup@example.com").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/sign-up",
        None,
        Some(json!({"fullName": "Someone Else", "email": "dup@example.com", "password": "secret-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/log-in")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = test_app();
    sign_up_and_log_in(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/log-in",
        None,
        Some(json!({"email": "ada@example.com", "password": "wrong-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid Email or Password");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/log-in",
        None,
        Some(json!({"email": "not-an-email"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid Email or Password");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized - No token provided");

    let (status, _) = send(&app, Method::GET, "/auth/profile", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_profile_lifecycle() {
    let app = test_app();
    let (_, token, _) = sign_up_and_log_in(&app, "ada@example.com").await;

    let (status, body) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Ada Lovelace");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/auth/profile",
        Some(&token),
        Some(json!({"fullName": "Ada King"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Ada King");

    let (status, body) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Ada King");

    let (status, body) = send(&app, Method::DELETE, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account deleted successfully");

    let (status, body) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User no longer exists");
}

#[tokio::test]
async fn test_logout_revokes_access_token() {
    let app = test_app();
    let (_, token, refresh) = sign_up_and_log_in(&app, "ada@example.com").await;

    let (status, _) = send(&app, Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has been revoked");

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/refresh-token",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = test_app();
    let (_, _, refresh) = sign_up_and_log_in(&app, "ada@example.com").await;

    let (status, body) = send(&app, Method::POST, "/auth/refresh-token", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Refresh token is required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/refresh-token",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "refresh failed: {}", body);
    let new_access = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/refresh-token",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/auth/profile", Some(&new_access), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_password() {
    let app = test_app();
    let (_, token, _) = sign_up_and_log_in(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/change-password",
        Some(&token),
        Some(json!({"currentPassword": "wrong-pass", "newPassword": "brand-new-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Current password is incorrect");

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/change-password",
        Some(&token),
        Some(json!({"currentPassword": "secret-pass", "newPassword": "brand-new-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/log-in",
        None,
        Some(json!({"email": "ada@example.com", "password": "brand-new-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_otp_password_reset() {
    let app = test_app();
    sign_up_and_log_in(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/request-otp",
        None,
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Email not found");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/request-otp",
        None,
        Some(json!({"email": "ada@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let otp = body["data"]["otp"].as_str().unwrap().to_string();
    assert_eq!(otp.len(), 6);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/verify-otp",
        None,
        Some(json!({"email": "ada@example.com", "otp": otp, "newPassword": "otp-reset-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/verify-otp",
        None,
        Some(json!({"email": "ada@example.com", "otp": otp, "newPassword": "another-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "OTP expired or not found");

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/log-in",
        None,
        Some(json!({"email": "ada@example.com", "password": "otp-reset-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_otp_hidden_outside_development() {
    for environment in [app_environment(None), "production".to_string(), "staging".to_string()] {
        let app = app_with_config(AppConfig {
            environment: environment.clone(),
            ..AppConfig::in_memory("api-test-secret")
        });
        sign_up_and_log_in(&app, "ada@example.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/request-otp",
            None,
            Some(json!({"email": "ada@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "ada@example.com");
        assert!(body["data"].get("otp").is_none(), "otp exposed in {}", environment);
    }
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/forgot-password",
        None,
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/reset-password",
        None,
        Some(json!({"token": "bogus", "newPassword": "new-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired reset token");
}

#[tokio::test]
async fn test_health_record_sections() {
    let app = test_app();
    let (user_id, token, _) = sign_up_and_log_in(&app, "ada@example.com").await;
    let base = format!("/dashboard/{}/manage-health", user_id);

    let (status, _) = send(&app, Method::GET, &format!("{}/basic-info", base), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/basic-info", base),
        Some(&token),
        Some(json!({"fullName": "Ada Lovelace", "DOB": "1990-05-17", "Gender": "Female"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "upsert failed: {}", body);
    assert_eq!(body["message"], "Basic info created successfully");
    assert_eq!(body["data"]["DOB"], "1990-05-17");
    assert_eq!(body["data"]["userId"], user_id.as_str());

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/basic-info", base),
        Some(&token),
        Some(json!({"fullName": "Ada King", "DOB": "1990-05-17"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Basic info updated successfully");

    let (status, body) = send(&app, Method::GET, &format!("{}/basic-info", base), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Ada King");

    let (status, body) = send(&app, Method::GET, &base, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["basicInfo"]["fullName"], "Ada King");
    assert!(body["data"]["note"].is_null());
}

#[tokio::test]
async fn test_health_status_accepts_numeric_strings() {
    let app = test_app();
    let (user_id, token, _) = sign_up_and_log_in(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/dashboard/{}/manage-health/health-status", user_id),
        Some(&token),
        Some(json!({"healthCondition": "Stable", "bloodPressure": "120", "heartRate": "72"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "upsert failed: {}", body);
    assert_eq!(body["data"]["bloodPressure"], 120.0);
    assert_eq!(body["data"]["heartRate"], 72.0);
}

#[tokio::test]
async fn test_health_record_rejections() {
    let app = test_app();
    let (user_id, token, _) = sign_up_and_log_in(&app, "ada@example.com").await;
    let (other_id, _, _) = sign_up_and_log_in(&app, "grace@example.com").await;

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/dashboard/{}/manage-health/basic-info", other_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/dashboard/{}/manage-health/blood-type", user_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/dashboard/{}/manage-health/health-status", user_id),
        Some(&token),
        Some(json!({"heartRate": 400})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
