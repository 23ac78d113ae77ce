use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::WebhookConfig;
use crate::models::WebhookPayload;
use crate::utils::error::Result;

pub const SENT_SUCCESSFULLY: &str = "Sent successfully";

/// Outcome of one webhook POST. Failures are data, never errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryResult {
    pub ok: bool,
    pub status_code: Option<u16>,
    pub detail: String,
}

impl DeliveryResult {
    pub fn delivered(status_code: u16) -> Self {
        Self {
            ok: true,
            status_code: Some(status_code),
            detail: SENT_SUCCESSFULLY.to_string(),
        }
    }

    pub fn failed(status_code: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            status_code,
            detail: detail.into(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    async fn deliver(&self, payload: &WebhookPayload, destination_url: &str, auth_token: &str) -> DeliveryResult;
}

pub struct HttpWebhookDispatcher {
    client: Client,
}

impl HttpWebhookDispatcher {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookDispatcher for HttpWebhookDispatcher {
    async fn deliver(&self, payload: &WebhookPayload, destination_url: &str, auth_token: &str) -> DeliveryResult {
        let response = match self
            .client
            .post(destination_url)
            .header("Authorization", auth_token)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let detail = if e.is_timeout() {
                    format!("webhook timed out: {}", e)
                } else {
                    format!("failed to reach webhook: {}", e)
                };
                tracing::warn!(offer_id = %payload.id, error = %e, "Webhook delivery failed");
                return DeliveryResult::failed(None, detail);
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::info!(
                offer_id = %payload.id,
                status = status.as_u16(),
                groups = payload.target_groups.len(),
                "Webhook delivered"
            );
            return DeliveryResult::delivered(status.as_u16());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(offer_id = %payload.id, status = status.as_u16(), "Webhook rejected delivery");
        DeliveryResult::failed(Some(status.as_u16()), body)
    }
}
