pub mod auth;
pub mod health;
pub mod health_record;
pub mod profile;

pub use health::{health_check, root};
