pub mod config;
pub mod description;
pub mod dispatcher;
pub mod feed_client;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use config::AppConfig;
pub use dispatcher::{DeliveryResult, HttpWebhookDispatcher, WebhookDispatcher};
pub use feed_client::{FeedSource, HttpFeedClient};
pub use pipeline::{CycleReport, OfferPipeline, PipelineSettings, SubscriberOutcome};
pub use scheduler::{OfferScheduler, SchedulerStats};
pub use store::{GroupDirectory, OfferStore, SqlStore};
pub use utils::error::{AppError, Result};
