use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::Platform;

/// A fan-out target registered on a messaging platform.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Group {
    pub id: String,
    pub api_identifier: String,
    pub name: String,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewGroupRequest {
    #[validate(length(min = 1, max = 255, message = "api_identifier is required"))]
    pub api_identifier: String,
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    pub platform: Platform,
}
