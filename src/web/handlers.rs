use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    CycleReport, SchedulerStats,
    models::{CatalogItem, Group, NewGroupRequest, NewUser, NewUserRequest, Offer, Subscriber, WebhookPayload},
    store::GroupDirectory,
    utils::error::AppError,
};
use super::{ApiResponse, AppState, HttpError};

const DEFAULT_OFFER_LIMIT: u32 = 20;
const MAX_OFFER_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub sitename: Option<String>,
    pub start: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct OffersQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AutoSendRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WebhookSendResponse {
    pub status: String,
    pub webhook_status: Option<u16>,
    pub detail: String,
}

// Feed proxy
pub async fn get_products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ApiResponse<Vec<CatalogItem>>>, HttpError> {
    let source = query
        .sitename
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| state.config.feed.source_name.clone());
    let start = query.start.unwrap_or(0);
    let limit = query.limit.unwrap_or(1);

    tracing::debug!(source = %source, start, limit, "Proxying feed request");

    let items = state.feed.fetch_latest(&source, start, limit).await?;
    Ok(Json(ApiResponse::success(items)))
}

// Manual webhook dispatch
pub async fn send_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> Json<ApiResponse<WebhookSendResponse>> {
    let result = state
        .dispatcher
        .deliver(&payload, &state.config.webhook.url, &state.config.webhook.auth_token)
        .await;

    let status = match (result.ok, result.status_code) {
        (true, _) => "success",
        (false, Some(_)) => "partial_error",
        (false, None) => "webhook_failed",
    };

    tracing::info!(offer_id = %payload.id, status, "Manual webhook dispatch");

    Json(ApiResponse::success(WebhookSendResponse {
        status: status.to_string(),
        webhook_status: result.status_code,
        detail: result.detail,
    }))
}

// User handlers
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Subscriber>>), HttpError> {
    request.validate().map_err(AppError::from)?;

    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| HttpError::internal(format!("password hashing task failed: {}", e)))??;

    let user = NewUser::from_request(request, password_hash);
    let subscriber = state.store.create_user(&user).await?;

    tracing::info!(email = %subscriber.email, auto_send = subscriber.auto_send_enabled, "Created user");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(subscriber))))
}

fn hash_password(password: &str) -> Result<String, HttpError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to hash password");
            HttpError::internal("Failed to hash password")
        })
}

pub async fn set_auto_send(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(request): Json<AutoSendRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, HttpError> {
    let email = email.trim().to_lowercase();
    state.store.set_auto_send(&email, request.enabled).await?;

    tracing::info!(email = %email, enabled = request.enabled, "Updated auto-send");
    Ok(Json(ApiResponse::success(serde_json::json!({
        "email": email,
        "auto_send_enabled": request.enabled,
    }))))
}

// Offer and group handlers
pub async fn list_offers(
    State(state): State<AppState>,
    Query(query): Query<OffersQuery>,
) -> Result<Json<ApiResponse<Vec<Offer>>>, HttpError> {
    let limit = query.limit.unwrap_or(DEFAULT_OFFER_LIMIT);
    if limit == 0 {
        return Err(HttpError::bad_request("limit must be greater than 0"));
    }
    let limit = limit.min(MAX_OFFER_LIMIT);

    let offers = state.store.list_recent_offers(limit).await?;
    let meta = serde_json::json!({ "limit": limit, "count": offers.len() });
    Ok(Json(ApiResponse::success_with_meta(offers, meta)))
}

pub async fn list_groups(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Group>>>, HttpError> {
    let groups = state.store.list_all_groups().await?;
    Ok(Json(ApiResponse::success(groups)))
}

pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<NewGroupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Group>>), HttpError> {
    request.validate().map_err(AppError::from)?;

    let group = state
        .store
        .create_group(request.api_identifier.trim(), request.name.trim(), request.platform)
        .await?;

    tracing::info!(group_id = %group.id, api_identifier = %group.api_identifier, "Created group");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(group))))
}

// Scheduler handlers
pub async fn run_scheduler_now(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CycleReport>>, HttpError> {
    let report = state.scheduler.trigger_now().await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn get_scheduler_stats(State(state): State<AppState>) -> Json<ApiResponse<SchedulerStats>> {
    Json(ApiResponse::success(state.scheduler.stats().await))
}
