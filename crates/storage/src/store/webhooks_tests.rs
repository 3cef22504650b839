// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use oj_core::WebhookEvent;
use serial_test::serial;

use crate::test_harness::test_store;

/// Invariant I2: a duplicate `delivery_id` is absorbed, not errored.
#[tokio::test]
#[serial]
async fn duplicate_delivery_id_is_absorbed() {
    let Some(store) = test_store().await else { return };

    let mut event = WebhookEvent::new("delivery-1", "issues", "opened", serde_json::json!({}));
    event.repo = Some("acme/widgets".to_string());
    event.issue_id = Some("42".to_string());

    assert!(store.create_webhook_event(&event).await.unwrap());

    let duplicate = WebhookEvent::new("delivery-1", "issues", "opened", serde_json::json!({}));
    assert!(!store.create_webhook_event(&duplicate).await.unwrap());
}

#[tokio::test]
#[serial]
async fn unprocessed_events_are_listed_oldest_first() {
    let Some(store) = test_store().await else { return };

    let a = WebhookEvent::new("delivery-a", "issues", "opened", serde_json::json!({}));
    let b = WebhookEvent::new("delivery-b", "issues", "labeled", serde_json::json!({}));
    store.create_webhook_event(&a).await.unwrap();
    store.create_webhook_event(&b).await.unwrap();

    let unprocessed = store.get_unprocessed_webhook_events(Utc::now(), 10).await.unwrap();
    assert_eq!(unprocessed.len(), 2);
    assert_eq!(unprocessed[0].delivery_id, "delivery-a");
}

#[tokio::test]
#[serial]
async fn marking_processed_coalesces_group() {
    let Some(store) = test_store().await else { return };

    let primary = WebhookEvent::new("delivery-c", "issues", "opened", serde_json::json!({}));
    let follower = WebhookEvent::new("delivery-d", "issues", "edited", serde_json::json!({}));
    store.create_webhook_event(&primary).await.unwrap();
    store.create_webhook_event(&follower).await.unwrap();

    store.mark_webhook_events_processed(&[primary.id, follower.id], Some(primary.id)).await.unwrap();

    let unprocessed = store.get_unprocessed_webhook_events(Utc::now(), 10).await.unwrap();
    assert!(unprocessed.is_empty());
}

#[tokio::test]
#[serial]
async fn recent_events_for_issue_filters_by_repo_and_issue() {
    let Some(store) = test_store().await else { return };

    let mut matching = WebhookEvent::new("delivery-e", "issues", "opened", serde_json::json!({}));
    matching.repo = Some("acme/widgets".to_string());
    matching.issue_id = Some("7".to_string());
    store.create_webhook_event(&matching).await.unwrap();

    let mut other = WebhookEvent::new("delivery-f", "issues", "opened", serde_json::json!({}));
    other.repo = Some("acme/widgets".to_string());
    other.issue_id = Some("8".to_string());
    store.create_webhook_event(&other).await.unwrap();

    let recent = store.get_recent_events_for_issue("acme/widgets", "7", Utc::now() - chrono::Duration::minutes(5)).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].delivery_id, "delivery-e");
}
