// HealthSure-api lib.rs
//
// This is the main library file for the HealthSure API.
// It re-exports the APIs from the various modules.

// Public modules
pub mod api;
pub mod config;
pub mod entities;
pub mod openapi;
pub mod state;

pub use config::AppConfig;
pub use state::AppState;
