// Repository module structure
pub mod errors;
mod health_record;
mod user;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use health_record::HealthRecordRepository;
pub use user::UserRepository;
