use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{Group, Offer, Platform};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetDetail {
    pub api_identifier: String,
    pub name: String,
    pub platform: Platform,
}

/// Body of the outbound webhook. Built fresh for every dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookPayload {
    pub id: String,
    pub description: String,
    pub image_url: Option<String>,
    pub target_groups: Vec<String>,
    pub target_details: Vec<TargetDetail>,
    pub timestamp: DateTime<Utc>,
    pub app: String,
}

impl WebhookPayload {
    /// Targets every distinct group identifier once, in directory order.
    pub fn for_offer(offer: &Offer, groups: &[Group], app: impl Into<String>) -> Self {
        let mut seen = HashSet::new();
        let mut target_groups = Vec::with_capacity(groups.len());
        let mut target_details = Vec::with_capacity(groups.len());

        for group in groups {
            if !seen.insert(group.api_identifier.as_str()) {
                continue;
            }
            target_groups.push(group.api_identifier.clone());
            target_details.push(TargetDetail {
                api_identifier: group.api_identifier.clone(),
                name: group.name.clone(),
                platform: group.platform.clone(),
            });
        }

        Self {
            id: offer.id.clone(),
            description: offer.description.clone(),
            image_url: offer.image_url.clone(),
            target_groups,
            target_details,
            timestamp: Utc::now(),
            app: app.into(),
        }
    }
}
