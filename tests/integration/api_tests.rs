use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn test_subscriber_signup_to_first_offer() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    harness.serve_feed(fan_item()).await;
    harness.accept_webhooks().await;

    let response = harness
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/users",
            json!({ "name": "Ana", "email": "ana@example.com", "password": "correct-horse-battery" }),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await?["data"]["auto_send_enabled"], false);

    let response = harness
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/groups",
            json!({ "api_identifier": "120363@g.us", "name": "Zap", "platform": "WHATSAPP" }),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Not opted in yet: the cycle has nobody to evaluate
    let response = harness
        .app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/api/scheduler/run").body(Body::empty())?)
        .await?;
    assert_eq!(body_json(response).await?["data"]["subscribers"], json!([]));

    let response = harness
        .app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/users/ana@example.com/auto-send",
            json!({ "enabled": true }),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness
        .app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/api/scheduler/run").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await?;
    assert_eq!(report["data"]["external_id"], "42");
    assert_eq!(report["data"]["subscribers"][0]["outcome"], "created");
    assert_eq!(report["data"]["subscribers"][0]["delivery"]["ok"], true);

    let response = harness.app.clone().oneshot(get("/api/offers")).await?;
    let offers = body_json(response).await?;
    assert_eq!(offers["meta"]["count"], 1);
    assert_eq!(offers["data"][0]["description"], FAN_DESCRIPTION);

    let bodies = harness.webhook_bodies().await;
    assert_eq!(bodies[0]["target_details"][0]["platform"], "WHATSAPP");
    Ok(())
}

#[tokio::test]
async fn test_products_proxy_passes_query_through() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(wiremock::matchers::query_param("sitename", "parceiro"))
        .and(wiremock::matchers::query_param("start", "10"))
        .and(wiremock::matchers::query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fan_item()))
        .expect(1)
        .mount(&harness.feed_server)
        .await;

    let response = harness
        .app
        .clone()
        .oneshot(get("/api/products?sitename=parceiro&start=10&limit=5"))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await?;
    assert_eq!(json["data"][0]["id"], "42");
    assert_eq!(json["data"][0]["title"], "Fan");
    Ok(())
}

#[tokio::test]
async fn test_products_proxy_upstream_failure() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown site"))
        .mount(&harness.feed_server)
        .await;

    let response = harness.app.clone().oneshot(get("/api/products")).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await?["success"], false);
    Ok(())
}

#[tokio::test]
async fn test_send_webhook_success() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    harness.accept_webhooks().await;

    let payload = json!({
        "id": "manual-1",
        "description": "Teste manual",
        "image_url": null,
        "target_groups": ["-100123"],
        "target_details": [{ "api_identifier": "-100123", "name": "Ofertas", "platform": "TELEGRAM" }],
        "timestamp": "2025-01-01T12:00:00Z",
        "app": "PromoShare"
    });

    let response = harness
        .app
        .clone()
        .oneshot(json_request("POST", "/api/send-webhook", payload))
        .await?;

    let json = body_json(response).await?;
    assert_eq!(json["data"]["status"], "success");
    assert_eq!(json["data"]["webhook_status"], 200);
    assert_eq!(json["data"]["detail"], "Sent successfully");
    assert_eq!(harness.webhook_bodies().await[0]["id"], "manual-1");
    Ok(())
}

#[tokio::test]
async fn test_send_webhook_unreachable_destination() -> anyhow::Result<()> {
    let mut harness = TestHarness::new().await?;
    harness.config.webhook.url = "http://127.0.0.1:1/webhook".to_string();
    let dispatcher = Arc::new(HttpWebhookDispatcher::new(&harness.config.webhook)?);
    let app = create_router(AppState {
        store: harness.store.clone(),
        feed: Arc::new(HttpFeedClient::new(&harness.config.feed)?),
        dispatcher,
        scheduler: harness.scheduler.clone(),
        config: Arc::new(harness.config.clone()),
    });

    let payload = json!({
        "id": "manual-2",
        "description": "Teste",
        "image_url": null,
        "target_groups": [],
        "target_details": [],
        "timestamp": "2025-01-01T12:00:00Z",
        "app": "PromoShare"
    });
    let response = app.oneshot(json_request("POST", "/api/send-webhook", payload)).await?;

    let json = body_json(response).await?;
    assert_eq!(json["data"]["status"], "webhook_failed");
    assert!(json["data"]["webhook_status"].is_null());
    Ok(())
}
