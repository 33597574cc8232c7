use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage model for a registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub full_name: String,
    /// Stored lowercased; unique across users
    pub email: String,
    /// Profile image URL
    pub image: Option<String>,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for inserting a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub image: Option<String>,
    pub password_hash: String,
}

/// Partial profile update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

impl ProfileChanges {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.image.is_none()
    }
}
