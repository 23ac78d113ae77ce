use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Feed unavailable ({}): {message}", display_status(.status))]
    FeedUnavailable { status: Option<u16>, message: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Offer already exists for description: {description}")]
    DuplicateOffer { description: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("A poll cycle is already running")]
    CycleBusy,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::StoreUnavailable(format!("migration failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

impl AppError {
    pub fn feed(status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::FeedUnavailable {
            status,
            message: message.into(),
        }
    }
}

fn display_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no status".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
