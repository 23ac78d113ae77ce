//! One poll cycle: fetch the newest catalog item, evaluate it for every
//! auto-send subscriber, persist it once and fan it out to all groups.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::description;
use crate::dispatcher::{DeliveryResult, WebhookDispatcher};
use crate::feed_client::FeedSource;
use crate::metrics;
use crate::models::{CatalogItem, NewOffer, Offer, Subscriber, WebhookPayload};
use crate::store::{GroupDirectory, OfferStore};
use crate::utils::error::AppError;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_name: String,
    pub webhook_url: String,
    pub webhook_auth_token: String,
    pub app_tag: String,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            source_name: config.feed.source_name.clone(),
            webhook_url: config.webhook.url.clone(),
            webhook_auth_token: config.webhook.auth_token.clone(),
            app_tag: config.webhook.app_tag.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubscriberOutcome {
    /// Cursor already points at this item.
    UpToDate,
    EmptyDescription,
    /// An offer with the same description exists.
    Duplicate,
    Created { offer_id: String, delivery: DeliveryResult },
    StoreFailed { message: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriberReport {
    pub subscriber: String,
    #[serde(flatten)]
    pub outcome: SubscriberOutcome,
    pub cursor_advanced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub external_id: Option<String>,
    pub subscribers: Vec<SubscriberReport>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CycleReport {
    fn begin() -> Self {
        Self {
            external_id: None,
            subscribers: Vec::new(),
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn created_offer_ids(&self) -> Vec<&str> {
        self.subscribers
            .iter()
            .filter_map(|s| match &s.outcome {
                SubscriberOutcome::Created { offer_id, .. } => Some(offer_id.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn deliveries(&self) -> Vec<&DeliveryResult> {
        self.subscribers
            .iter()
            .filter_map(|s| match &s.outcome {
                SubscriberOutcome::Created { delivery, .. } => Some(delivery),
                _ => None,
            })
            .collect()
    }
}

pub struct OfferPipeline {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn OfferStore>,
    groups: Arc<dyn GroupDirectory>,
    dispatcher: Arc<dyn WebhookDispatcher>,
    settings: PipelineSettings,
}

impl OfferPipeline {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn OfferStore>,
        groups: Arc<dyn GroupDirectory>,
        dispatcher: Arc<dyn WebhookDispatcher>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            feed,
            store,
            groups,
            dispatcher,
            settings,
        }
    }

    /// Runs one cycle. Never fails: every error ends up logged and in the report.
    pub async fn run_cycle(&self) -> CycleReport {
        let report = self.cycle().await;
        metrics::cycle_completed();
        report
    }

    async fn cycle(&self) -> CycleReport {
        let mut report = CycleReport::begin();

        let items = match self.feed.fetch_latest(&self.settings.source_name, 0, 1).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    source = %self.settings.source_name,
                    error = %e,
                    "Feed fetch failed, skipping cycle"
                );
                metrics::feed_failure();
                report.error = Some(e.to_string());
                return report.finish();
            }
        };

        let Some(item) = items.into_iter().next() else {
            tracing::debug!(source = %self.settings.source_name, "Feed returned no items");
            return report.finish();
        };
        report.external_id = Some(item.id.clone());

        let subscribers = match self.store.get_auto_send_subscribers().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load auto-send subscribers");
                metrics::store_failure();
                report.error = Some(e.to_string());
                return report.finish();
            }
        };

        if subscribers.is_empty() {
            tracing::debug!(external_id = %item.id, "No auto-send subscribers");
            return report.finish();
        }

        let description = description::build(&item.attributes);

        for subscriber in &subscribers {
            let entry = self.evaluate(subscriber, &item, &description).await;
            report.subscribers.push(entry);
        }

        let report = report.finish();
        tracing::info!(
            external_id = %item.id,
            subscribers = report.subscribers.len(),
            created = report.created_offer_ids().len(),
            "Poll cycle finished"
        );
        report
    }

    async fn evaluate(
        &self,
        subscriber: &Subscriber,
        item: &CatalogItem,
        description: &str,
    ) -> SubscriberReport {
        let key = subscriber.key().to_string();

        if subscriber.has_seen(&item.id) {
            return SubscriberReport {
                subscriber: key,
                outcome: SubscriberOutcome::UpToDate,
                cursor_advanced: false,
            };
        }

        if description.is_empty() {
            tracing::debug!(subscriber = %key, external_id = %item.id, "Item has no usable fields");
            let cursor_advanced = self.advance_cursor(&key, &item.id).await;
            return SubscriberReport {
                subscriber: key,
                outcome: SubscriberOutcome::EmptyDescription,
                cursor_advanced,
            };
        }

        let outcome = match self.persist(description, item).await {
            Ok(Some(offer)) => {
                metrics::offer_created();
                let delivery = self.dispatch(&offer).await;
                metrics::delivery(delivery.ok);
                SubscriberOutcome::Created {
                    offer_id: offer.id,
                    delivery,
                }
            }
            Ok(None) => {
                metrics::duplicate_suppressed();
                SubscriberOutcome::Duplicate
            }
            Err(e) => {
                tracing::error!(
                    subscriber = %key,
                    external_id = %item.id,
                    error = %e,
                    "Offer store failed, cursor left unchanged"
                );
                metrics::store_failure();
                return SubscriberReport {
                    subscriber: key,
                    outcome: SubscriberOutcome::StoreFailed { message: e.to_string() },
                    cursor_advanced: false,
                };
            }
        };

        let cursor_advanced = self.advance_cursor(&key, &item.id).await;
        SubscriberReport {
            subscriber: key,
            outcome,
            cursor_advanced,
        }
    }

    /// `Ok(None)` when the description is already taken.
    async fn persist(&self, description: &str, item: &CatalogItem) -> Result<Option<Offer>, AppError> {
        if self.store.exists_by_description(description).await? {
            tracing::debug!(external_id = %item.id, "Offer already distributed");
            return Ok(None);
        }

        let new_offer = NewOffer::new(description, item.attributes.image.clone());
        match self.store.insert(&new_offer).await {
            Ok(offer) => {
                tracing::info!(offer_id = %offer.id, external_id = %item.id, "Offer created");
                Ok(Some(offer))
            }
            Err(AppError::DuplicateOffer { .. }) => {
                tracing::debug!(external_id = %item.id, "Offer inserted concurrently");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn dispatch(&self, offer: &Offer) -> DeliveryResult {
        let groups = match self.groups.list_all_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                tracing::error!(offer_id = %offer.id, error = %e, "Group lookup failed, offer not dispatched");
                return DeliveryResult::failed(None, format!("group lookup failed: {}", e));
            }
        };

        let payload = WebhookPayload::for_offer(offer, &groups, self.settings.app_tag.clone());
        self.dispatcher
            .deliver(&payload, &self.settings.webhook_url, &self.settings.webhook_auth_token)
            .await
    }

    async fn advance_cursor(&self, subscriber_key: &str, external_id: &str) -> bool {
        match self.store.update_cursor(subscriber_key, external_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(subscriber = %subscriber_key, external_id, error = %e, "Failed to update cursor");
                false
            }
        }
    }
}
