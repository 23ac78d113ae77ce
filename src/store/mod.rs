//! Persistence seams of the pipeline.

use async_trait::async_trait;

use crate::models::{Group, NewOffer, Offer, Subscriber};
use crate::utils::error::Result;

pub mod sql_store;

pub use sql_store::SqlStore;

/// Offers and per-subscriber cursors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OfferStore: Send + Sync {
    /// True if an offer with exactly this description exists.
    async fn exists_by_description(&self, description: &str) -> Result<bool>;

    /// Fails with `DuplicateOffer` if the description was taken meanwhile.
    async fn insert(&self, offer: &NewOffer) -> Result<Offer>;

    /// Subscribers with auto-send enabled, in store order.
    async fn get_auto_send_subscribers(&self) -> Result<Vec<Subscriber>>;

    async fn update_cursor(&self, subscriber_key: &str, external_id: &str) -> Result<()>;
}

/// Read-only view of the fan-out targets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn list_all_groups(&self) -> Result<Vec<Group>>;
}
