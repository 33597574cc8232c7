// HealthSure Data
// This crate handles data access and external service interactions

// Database connection management
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;

// Key/value cache used for sessions, OTPs and cached reads
pub mod cache;
