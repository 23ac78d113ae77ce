use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A distributed offer. The description is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Offer {
    pub id: String,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOffer {
    pub description: String,
    pub image_url: Option<String>,
}

impl NewOffer {
    pub fn new(description: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            description: description.into(),
            image_url,
        }
    }
}
