use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{UserRole, generate_id};

/// An account of the `users` table as seen by the polling pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Subscriber {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub auto_send_enabled: bool,
    pub last_checked_offer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    /// Key used for cursor updates.
    pub fn key(&self) -> &str {
        &self.email
    }

    /// True when the subscriber already evaluated this external item.
    pub fn has_seen(&self, external_id: &str) -> bool {
        self.last_checked_offer_id.as_deref() == Some(external_id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUserRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must have at least 8 characters"))]
    pub password: String,
    pub role: Option<UserRole>,
    pub auto_send_enabled: Option<bool>,
}

/// A validated user ready for insertion; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub password_hash: String,
    pub auto_send_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn from_request(request: NewUserRequest, password_hash: String) -> Self {
        Self {
            id: generate_id(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            role: request.role.unwrap_or(UserRole::User),
            password_hash,
            auto_send_enabled: request.auto_send_enabled.unwrap_or(false),
            created_at: Utc::now(),
        }
    }
}
