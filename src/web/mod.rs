use axum::{
    Router,
    middleware::from_fn,
    response::Json,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{AppConfig, OfferScheduler, SqlStore, dispatcher::WebhookDispatcher, feed_client::FeedSource};

pub mod handlers;
pub mod middleware;
pub mod responses;

pub use handlers::{
    create_group, create_user, get_products, get_scheduler_stats, list_groups, list_offers, run_scheduler_now,
    send_webhook, set_auto_send,
};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub store: SqlStore,
    pub feed: Arc<dyn FeedSource>,
    pub dispatcher: Arc<dyn WebhookDispatcher>,
    pub scheduler: Arc<OfferScheduler>,
    pub config: Arc<AppConfig>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(CorsLayer::permissive())
                .layer(from_fn(middleware::request_logging)),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Feed proxy and manual dispatch
        .route("/products", get(get_products))
        .route("/send-webhook", post(send_webhook))
        // Users
        .route("/users", post(create_user))
        .route("/users/:email/auto-send", put(set_auto_send))
        // Offers and groups
        .route("/offers", get(list_offers))
        .route("/groups", get(list_groups).post(create_group))
        // Scheduler
        .route("/scheduler/run", post(run_scheduler_now))
        .route("/scheduler/stats", get(get_scheduler_stats))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "promoshare-relay"
    }))
}
