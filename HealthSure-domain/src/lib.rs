// HealthSure Domain
// This crate contains the business logic for the HealthSure API

// Services that implement business logic
pub mod services;

// Authentication
pub mod auth;

// Domain entities
pub mod entities;

// Health checks and system status
pub mod health;

// Outgoing account notifications
pub mod notification;

// Cache key layout and lifetimes
pub mod cache_keys;

// Re-export the storage modules from health_sure_data for convenience
pub use health_sure_data::{cache, database};
