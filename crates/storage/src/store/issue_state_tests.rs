// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use oj_core::{ClassificationCategory, IssueStatePatch};
use serial_test::serial;

use crate::test_harness::test_store;

#[tokio::test]
#[serial]
async fn upsert_creates_then_merges() {
    let Some(store) = test_store().await else { return };

    let patch = IssueStatePatch::default().classification(ClassificationCategory::Simple).retry_count(0);
    store.upsert_issue_state(1, "acme/widgets", &patch).await.unwrap();

    let state = store.get_issue_state(1, "acme/widgets").await.unwrap().unwrap();
    assert_eq!(state.classification, Some(ClassificationCategory::Simple));
    assert_eq!(state.retry_count, 0);

    let patch = IssueStatePatch::default().retry_count(1).merge_metadata(serde_json::json!({"ci_fix_count": 1}));
    store.upsert_issue_state(1, "acme/widgets", &patch).await.unwrap();

    let state = store.get_issue_state(1, "acme/widgets").await.unwrap().unwrap();
    // classification preserved even though this patch didn't set it.
    assert_eq!(state.classification, Some(ClassificationCategory::Simple));
    assert_eq!(state.retry_count, 1);
    assert_eq!(state.ci_fix_count(), 1);
}

#[tokio::test]
#[serial]
async fn metadata_merges_rather_than_replaces() {
    let Some(store) = test_store().await else { return };

    store
        .upsert_issue_state(2, "acme/widgets", &IssueStatePatch::default().merge_metadata(serde_json::json!({"a": 1})))
        .await
        .unwrap();
    store
        .upsert_issue_state(2, "acme/widgets", &IssueStatePatch::default().merge_metadata(serde_json::json!({"b": 2})))
        .await
        .unwrap();

    let state = store.get_issue_state(2, "acme/widgets").await.unwrap().unwrap();
    assert_eq!(state.metadata.get("a").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(state.metadata.get("b").and_then(|v| v.as_i64()), Some(2));
}

#[tokio::test]
#[serial]
async fn list_issue_states_filters_by_classification() {
    let Some(store) = test_store().await else { return };

    store
        .upsert_issue_state(3, "acme/widgets", &IssueStatePatch::default().classification(ClassificationCategory::Complex))
        .await
        .unwrap();
    store
        .upsert_issue_state(4, "acme/widgets", &IssueStatePatch::default().classification(ClassificationCategory::Skip))
        .await
        .unwrap();

    let complex = store.list_issue_states("acme/widgets", Some(ClassificationCategory::Complex)).await.unwrap();
    assert_eq!(complex.len(), 1);
    assert_eq!(complex[0].issue_number, 3);

    let all = store.list_issue_states("acme/widgets", None).await.unwrap();
    assert_eq!(all.len(), 2);
}
