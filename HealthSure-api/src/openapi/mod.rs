use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use health_sure_domain::entities::{
    Appointment, BasicInfo, ChangePasswordRequest, Doctor, FieldViolation, ForgotPasswordRequest,
    Gender, HealthStatus, LabResult, LoginRequest, LoginResponse, MedicalHistory, MedicalReport,
    Medication, Note, OtpIssued, OtpRequest, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, Surgery, TestResult, TokenPair, TreatmentInfo, UpdateProfileRequest,
    UserProfile, VerifyOtpRequest,
};

use crate::api::handlers::health::{ComponentHealthStatus, HealthResponse, ServiceInfo};
use crate::entities::{
    ErrorResponse, LoginEnvelope, MessageResponse, OtpEnvelope, ProfileResponse, TokenEnvelope,
};

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the bearer JWT scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::root,
        crate::api::handlers::health::health_check,

        crate::api::handlers::auth::sign_up,
        crate::api::handlers::auth::log_in,
        crate::api::handlers::auth::refresh_token,
        crate::api::handlers::auth::logout,
        crate::api::handlers::auth::request_otp,
        crate::api::handlers::auth::verify_otp,
        crate::api::handlers::auth::forgot_password,
        crate::api::handlers::auth::reset_password,

        crate::api::handlers::profile::get_profile,
        crate::api::handlers::profile::update_profile,
        crate::api::handlers::profile::delete_profile,
        crate::api::handlers::profile::change_password,

        crate::api::handlers::health_record::get_health_record,
        crate::api::handlers::health_record::get_section,
        crate::api::handlers::health_record::upsert_section
    ),
    components(
        schemas(
            HealthResponse,
            ComponentHealthStatus,
            ServiceInfo,

            ErrorResponse,
            MessageResponse,
            ProfileResponse,
            LoginEnvelope,
            TokenEnvelope,
            OtpEnvelope,
            FieldViolation,

            UserProfile,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            TokenPair,
            UpdateProfileRequest,
            ChangePasswordRequest,
            OtpRequest,
            OtpIssued,
            VerifyOtpRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,

            Gender,
            BasicInfo,
            HealthStatus,
            Surgery,
            Medication,
            MedicalHistory,
            Doctor,
            Appointment,
            TreatmentInfo,
            TestResult,
            MedicalReport,
            LabResult,
            Note
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service status"),
        (name = "Authentication", description = "Registration, login, tokens and password recovery"),
        (name = "Profile", description = "Account management for the signed-in user"),
        (name = "Health Records", description = "Personal health record sections")
    ),
    info(
        title = "HealthSure API",
        version = "0.1.0",
        description = "Personal health records with JWT authentication",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "HealthSure API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().expect("tags should be defined");
        assert!(tags.iter().any(|tag| tag.name == "Authentication"));
        assert!(tags.iter().any(|tag| tag.name == "Health Records"));

        let paths = &openapi.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/auth/sign-up"));
        assert!(paths.contains_key("/auth/profile"));
        assert!(paths.contains_key("/dashboard/{userId}/manage-health"));
        assert!(paths.contains_key("/dashboard/{userId}/manage-health/{section}"));
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components should be defined");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
