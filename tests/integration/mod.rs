// Integration tests for the PromoShare relay
// These tests wire the real store, feed client and dispatcher together

pub mod api_tests;
pub mod pipeline_tests;

use axum::Router;
use promoshare_relay::{
    AppConfig, HttpFeedClient, HttpWebhookDispatcher, OfferPipeline, OfferScheduler, OfferStore, PipelineSettings,
    SqlStore,
    models::{Group, NewUser, NewUserRequest, Platform, Subscriber, UserRole},
    web::{AppState, create_router},
};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WEBHOOK_PATH: &str = "/webhook/promoshare";
pub const WEBHOOK_TOKEN: &str = "test-token";

pub struct TestHarness {
    pub config: AppConfig,
    pub store: SqlStore,
    pub feed_server: MockServer,
    pub hook_server: MockServer,
    pub scheduler: Arc<OfferScheduler>,
    pub app: Router,
}

impl TestHarness {
    pub async fn new() -> anyhow::Result<Self> {
        let feed_server = MockServer::start().await;
        let hook_server = MockServer::start().await;

        let mut config = AppConfig::from_defaults()?;
        config.feed.base_url = feed_server.uri();
        config.feed.request_timeout = 1;
        config.feed.retry_attempts = 0;
        config.feed.retry_delay_ms = 1;
        config.webhook.url = format!("{}{}", hook_server.uri(), WEBHOOK_PATH);
        config.webhook.auth_token = WEBHOOK_TOKEN.to_string();
        config.webhook.request_timeout = 1;
        config.scheduler.poll_interval_secs = 1;

        let store = SqlStore::in_memory().await?;
        let feed = Arc::new(HttpFeedClient::new(&config.feed)?);
        let dispatcher = Arc::new(HttpWebhookDispatcher::new(&config.webhook)?);

        let pipeline = Arc::new(OfferPipeline::new(
            feed.clone(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            dispatcher.clone(),
            PipelineSettings::from_config(&config),
        ));
        let scheduler = Arc::new(OfferScheduler::new(pipeline, &config.scheduler));

        let app = create_router(AppState {
            store: store.clone(),
            feed,
            dispatcher,
            scheduler: scheduler.clone(),
            config: Arc::new(config.clone()),
        });

        Ok(Self {
            config,
            store,
            feed_server,
            hook_server,
            scheduler,
            app,
        })
    }

    /// Serves `items` as the newest catalog page.
    pub async fn serve_feed(&self, items: Value) {
        self.feed_server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items))
            .mount(&self.feed_server)
            .await;
    }

    /// Answers 200 only to requests carrying the configured token.
    pub async fn accept_webhooks(&self) {
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .and(header("Authorization", WEBHOOK_TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&self.hook_server)
            .await;
    }

    pub async fn webhook_bodies(&self) -> Vec<Value> {
        self.hook_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == WEBHOOK_PATH)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    pub async fn add_subscriber(&self, email: &str, cursor: Option<&str>) -> anyhow::Result<Subscriber> {
        let user = NewUser::from_request(
            NewUserRequest {
                name: email.to_string(),
                email: email.to_string(),
                password: "not-used-in-tests".to_string(),
                role: Some(UserRole::User),
                auto_send_enabled: Some(true),
            },
            "hash".to_string(),
        );
        let subscriber = self.store.create_user(&user).await?;
        if let Some(cursor) = cursor {
            self.store.update_cursor(&subscriber.email, cursor).await?;
        }
        Ok(subscriber)
    }

    pub async fn add_group(&self, api_identifier: &str) -> anyhow::Result<Group> {
        Ok(self
            .store
            .create_group(api_identifier, &format!("Group {}", api_identifier), Platform::Telegram)
            .await?)
    }

    pub async fn cursor_of(&self, email: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .store
            .get_subscriber(email)
            .await?
            .and_then(|s| s.last_checked_offer_id))
    }
}

pub fn fan_item() -> Value {
    json!([{ "id": "42", "title": "Fan", "price": "R$99", "link": "http://x/42", "image": "http://x/42.png" }])
}

pub const FAN_DESCRIPTION: &str = "Fan\n\n🔥 R$99\n\n🛒 Compre aqui:\nhttp://x/42";
