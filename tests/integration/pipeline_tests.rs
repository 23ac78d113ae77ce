use super::*;
use promoshare_relay::SubscriberOutcome;
use std::time::Duration;

#[tokio::test]
async fn test_new_item_is_stored_and_fanned_out() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    harness.serve_feed(fan_item()).await;
    harness.accept_webhooks().await;
    harness.add_subscriber("ana@example.com", Some("41")).await?;
    for id in ["g1", "g2", "g3"] {
        harness.add_group(id).await?;
    }

    let report = harness.scheduler.trigger_now().await?;

    assert_eq!(report.external_id.as_deref(), Some("42"));
    assert_eq!(report.created_offer_ids().len(), 1);
    assert!(report.deliveries()[0].ok);

    let offers = harness.store.list_recent_offers(10).await?;
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].description, FAN_DESCRIPTION);
    assert_eq!(offers[0].image_url.as_deref(), Some("http://x/42.png"));

    let bodies = harness.webhook_bodies().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["id"], offers[0].id.as_str());
    assert_eq!(bodies[0]["target_groups"], json!(["g1", "g2", "g3"]));
    assert_eq!(bodies[0]["app"], "PromoShare");

    assert_eq!(harness.cursor_of("ana@example.com").await?.as_deref(), Some("42"));
    Ok(())
}

#[tokio::test]
async fn test_repeated_cycles_create_a_single_offer() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    harness.serve_feed(fan_item()).await;
    harness.accept_webhooks().await;
    harness.add_subscriber("ana@example.com", None).await?;
    harness.add_subscriber("bia@example.com", None).await?;
    harness.add_group("g1").await?;

    let first = harness.scheduler.trigger_now().await?;
    let second = harness.scheduler.trigger_now().await?;

    assert_eq!(first.created_offer_ids().len(), 1);
    assert_eq!(first.subscribers[1].outcome, SubscriberOutcome::Duplicate);
    assert!(second.subscribers.iter().all(|s| s.outcome == SubscriberOutcome::UpToDate));

    assert_eq!(harness.store.count_offers().await?, 1);
    assert_eq!(harness.webhook_bodies().await.len(), 1);
    assert_eq!(harness.cursor_of("bia@example.com").await?.as_deref(), Some("42"));
    Ok(())
}

#[tokio::test]
async fn test_same_text_under_new_id_is_suppressed() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    harness.accept_webhooks().await;
    harness.add_subscriber("ana@example.com", None).await?;
    harness.add_group("g1").await?;

    harness.serve_feed(fan_item()).await;
    harness.scheduler.trigger_now().await?;

    harness
        .serve_feed(json!([{ "id": "43", "title": "Fan", "price": "R$99", "link": "http://x/42" }]))
        .await;
    let report = harness.scheduler.trigger_now().await?;

    assert_eq!(report.subscribers[0].outcome, SubscriberOutcome::Duplicate);
    assert_eq!(harness.store.count_offers().await?, 1);
    assert_eq!(harness.cursor_of("ana@example.com").await?.as_deref(), Some("43"));
    Ok(())
}

#[tokio::test]
async fn test_feed_timeout_leaves_state_untouched() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fan_item()).set_delay(Duration::from_secs(3)))
        .mount(&harness.feed_server)
        .await;
    harness.add_subscriber("ana@example.com", Some("41")).await?;

    let report = harness.scheduler.trigger_now().await?;

    assert!(report.error.is_some());
    assert_eq!(harness.store.count_offers().await?, 0);
    assert_eq!(harness.cursor_of("ana@example.com").await?.as_deref(), Some("41"));
    assert!(harness.webhook_bodies().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_empty_item_only_moves_cursor() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    harness
        .serve_feed(json!({ "products": [{ "id": 77, "image": "http://x/77.png", "free_shipping": true }] }))
        .await;
    harness.add_subscriber("ana@example.com", None).await?;

    let report = harness.scheduler.trigger_now().await?;

    assert_eq!(report.subscribers[0].outcome, SubscriberOutcome::EmptyDescription);
    assert_eq!(harness.store.count_offers().await?, 0);
    assert_eq!(harness.cursor_of("ana@example.com").await?.as_deref(), Some("77"));
    Ok(())
}

#[tokio::test]
async fn test_rejected_webhook_keeps_offer_and_cursor() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    harness.serve_feed(fan_item()).await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&harness.hook_server)
        .await;
    harness.add_subscriber("ana@example.com", None).await?;
    harness.add_group("g1").await?;

    let report = harness.scheduler.trigger_now().await?;

    let delivery = report.deliveries()[0];
    assert!(!delivery.ok);
    assert_eq!(delivery.status_code, Some(502));
    assert_eq!(harness.store.count_offers().await?, 1);
    assert_eq!(harness.cursor_of("ana@example.com").await?.as_deref(), Some("42"));

    // Not retried on the next cycle
    harness.scheduler.trigger_now().await?;
    Ok(())
}

#[tokio::test]
async fn test_no_subscribers_means_no_writes() -> anyhow::Result<()> {
    let harness = TestHarness::new().await?;
    harness.serve_feed(fan_item()).await;

    let report = harness.scheduler.trigger_now().await?;

    assert!(report.subscribers.is_empty());
    assert_eq!(harness.store.count_offers().await?, 0);
    Ok(())
}
