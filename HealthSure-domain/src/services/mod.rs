// Domain services
// This module contains business logic implementations.

pub mod health_record;
pub mod user;

// Re-export service traits and implementations
pub use health_record::{
    HealthRecordService, HealthRecordServiceError, HealthRecordServiceTrait, SectionUpsert,
};
pub use user::{UserService, UserServiceConfig, UserServiceError, UserServiceTrait};
