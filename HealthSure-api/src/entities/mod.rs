// Public entities for the HealthSure API
// Response envelopes shared across handlers. Request and domain types live in
// health_sure_domain::entities.

pub mod common;

pub use common::{
    ApiResponse, ErrorResponse, LoginEnvelope, MessageResponse, OtpEnvelope, ProfileResponse,
    TokenEnvelope,
};
