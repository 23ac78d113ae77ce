use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::FeedConfig;
use crate::models::{CatalogItem, FeedResponse};
use crate::utils::error::{AppError, Result};

/// Read-only access to the external product catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches up to `limit` items starting at `offset`, newest first.
    async fn fetch_latest(&self, source_name: &str, offset: u32, limit: u32) -> Result<Vec<CatalogItem>>;
}

pub struct HttpFeedClient {
    client: Client,
    base_url: String,
    retry_attempts: u32,
    retry_delay_ms: u64,
}

impl HttpFeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry_attempts: config.retry_attempts,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    fn products_url(&self) -> String {
        format!("{}/api/products", self.base_url)
    }

    async fn fetch_once(&self, source_name: &str, offset: u32, limit: u32) -> Result<Vec<CatalogItem>> {
        let response = self
            .client
            .get(self.products_url())
            .query(&[
                ("sitename", source_name.to_string()),
                ("start", offset.to_string()),
                ("limit", limit.to_string()),
            ])
            .header("accept", "application/json, text/plain, */*")
            .header("accept-language", "pt-BR,pt;q=0.9")
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("request timed out: {}", e)
                } else {
                    format!("failed to reach feed: {}", e)
                };
                AppError::feed(None, message)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::feed(
                Some(status.as_u16()),
                format!("feed responded with {}: {}", status, body),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::feed(Some(status.as_u16()), format!("failed to read feed body: {}", e)))?;

        let parsed: FeedResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::feed(Some(status.as_u16()), format!("malformed feed response: {}", e)))?;

        Ok(parsed.into_items())
    }
}

/// Only failures without an upstream status (transport errors) are retried.
fn is_transient(error: &AppError) -> bool {
    matches!(error, AppError::FeedUnavailable { status: None, .. })
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch_latest(&self, source_name: &str, offset: u32, limit: u32) -> Result<Vec<CatalogItem>> {
        if limit == 0 {
            return Err(AppError::Validation("limit must be at least 1".to_string()));
        }

        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.retry_delay_ms.max(1))
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.retry_attempts as usize);

        let items = RetryIf::spawn(
            strategy,
            || self.fetch_once(source_name, offset, limit),
            is_transient,
        )
        .await?;

        tracing::debug!(source = source_name, count = items.len(), "Fetched catalog items");
        Ok(items)
    }
}
