use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use super::{GroupDirectory, OfferStore};
use crate::config::DatabaseConfig;
use crate::models::{Group, NewOffer, NewUser, Offer, Platform, Subscriber, generate_id};
use crate::utils::error::{AppError, Result};

const SUBSCRIBER_COLUMNS: &str =
    "id, name, email, role, password_hash, auto_send_enabled, last_checked_offer_id, created_at";

/// SQL-backed offer store and group directory.
#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::debug!("Connecting to database...");
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect_with(options)
            .await?;
        tracing::info!("Connected to database");

        Ok(Self { pool })
    }

    /// Single-connection in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<Subscriber> {
        let result = sqlx::query(
            "INSERT INTO users (id, name, email, role, password_hash, auto_send_enabled, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role)
        .bind(&user.password_hash)
        .bind(user.auto_send_enabled)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Subscriber {
                id: user.id.clone(),
                name: user.name.clone(),
                email: user.email.clone(),
                role: user.role.clone(),
                password_hash: user.password_hash.clone(),
                auto_send_enabled: user.auto_send_enabled,
                last_checked_offer_id: None,
                created_at: user.created_at,
            }),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Conflict(format!("email {} is already registered", user.email)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_subscriber(&self, email: &str) -> Result<Option<Subscriber>> {
        let query = format!("SELECT {} FROM users WHERE email = ?", SUBSCRIBER_COLUMNS);
        Ok(sqlx::query_as::<_, Subscriber>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn set_auto_send(&self, email: &str, enabled: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET auto_send_enabled = ? WHERE email = ?")
            .bind(enabled)
            .bind(email)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound {
                resource: format!("user {}", email),
            });
        }
        Ok(())
    }

    pub async fn list_recent_offers(&self, limit: u32) -> Result<Vec<Offer>> {
        Ok(sqlx::query_as::<_, Offer>(
            "SELECT id, description, image_url, created_at FROM offers ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn count_offers(&self) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM offers")
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn create_group(&self, api_identifier: &str, name: &str, platform: Platform) -> Result<Group> {
        let group = Group {
            id: generate_id(),
            api_identifier: api_identifier.to_string(),
            name: name.to_string(),
            platform,
            created_at: Utc::now(),
        };

        sqlx::query(r#"INSERT INTO "groups" (id, api_identifier, name, platform, created_at) VALUES (?, ?, ?, ?, ?)"#)
            .bind(&group.id)
            .bind(&group.api_identifier)
            .bind(&group.name)
            .bind(&group.platform)
            .bind(group.created_at)
            .execute(&self.pool)
            .await?;

        Ok(group)
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl OfferStore for SqlStore {
    async fn exists_by_description(&self, description: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM offers WHERE description = ?")
            .bind(description)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, offer: &NewOffer) -> Result<Offer> {
        let created = Offer {
            id: generate_id(),
            description: offer.description.clone(),
            image_url: offer.image_url.clone(),
            created_at: Utc::now(),
        };

        let result = sqlx::query("INSERT INTO offers (id, description, image_url, created_at) VALUES (?, ?, ?, ?)")
            .bind(&created.id)
            .bind(&created.description)
            .bind(&created.image_url)
            .bind(created.created_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(created),
            Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateOffer {
                description: offer.description.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_auto_send_subscribers(&self) -> Result<Vec<Subscriber>> {
        let query = format!(
            "SELECT {} FROM users WHERE auto_send_enabled = 1 ORDER BY created_at, email",
            SUBSCRIBER_COLUMNS
        );
        Ok(sqlx::query_as::<_, Subscriber>(&query).fetch_all(&self.pool).await?)
    }

    async fn update_cursor(&self, subscriber_key: &str, external_id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET last_checked_offer_id = ? WHERE email = ?")
            .bind(external_id)
            .bind(subscriber_key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound {
                resource: format!("subscriber {}", subscriber_key),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GroupDirectory for SqlStore {
    async fn list_all_groups(&self) -> Result<Vec<Group>> {
        Ok(sqlx::query_as::<_, Group>(
            r#"SELECT id, api_identifier, name, platform, created_at FROM "groups" ORDER BY created_at, name"#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
