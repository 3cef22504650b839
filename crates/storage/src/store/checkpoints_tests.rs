// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use oj_core::{Checkpoint, Execution};
use serial_test::serial;

use crate::test_harness::test_store;

#[tokio::test]
#[serial]
async fn latest_checkpoint_is_the_most_recent() {
    let Some(store) = test_store().await else { return };

    let exec = Execution::builder().issue_id("50").build();
    store.create_execution(&exec).await.unwrap();

    let first = Checkpoint::new("50", exec.id, serde_json::json!({"context_summary": "first pass"}));
    store.save_checkpoint(&first).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let second = Checkpoint::new("50", exec.id, serde_json::json!({"context_summary": "second pass"}));
    store.save_checkpoint(&second).await.unwrap();

    let latest = store.get_latest_checkpoint("50").await.unwrap().unwrap();
    assert_eq!(latest.context_summary(), Some("second pass"));

    let all = store.get_all_checkpoints("50").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].context_summary(), Some("second pass"));
}

#[tokio::test]
#[serial]
async fn no_checkpoint_for_unknown_issue() {
    let Some(store) = test_store().await else { return };
    assert!(store.get_latest_checkpoint("does-not-exist").await.unwrap().is_none());
}
