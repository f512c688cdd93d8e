//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID (also used as document ID)
    pub user_id: Uuid,
    /// Unique login name
    pub username: String,
    /// bcrypt hash of the password
    pub password_hash: String,
    /// Optional linked account on an external platform (unique when set)
    pub third_party_id: Option<String>,
    /// When the account was created
    #[serde(with = "crate::time_utils::rfc3339_utc")]
    pub created_at: DateTime<Utc>,
}
