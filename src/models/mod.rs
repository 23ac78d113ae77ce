use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod catalog_item;
pub mod group;
pub mod offer;
pub mod subscriber;
pub mod webhook_payload;

// Re-exports for convenience
pub use catalog_item::*;
pub use group::*;
pub use offer::*;
pub use subscriber::*;
pub use webhook_payload::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT")]
pub enum Platform {
    #[sqlx(rename = "TELEGRAM")]
    Telegram,
    #[sqlx(rename = "WHATSAPP")]
    Whatsapp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT")]
pub enum UserRole {
    #[sqlx(rename = "ADMIN")]
    Admin,
    #[sqlx(rename = "USER")]
    User,
}

// Helper function to generate UUIDs in the format expected by the database
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
