// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use oj_core::{Execution, ExecutionMode};
use serial_test::serial;

use crate::test_harness::test_store;

/// Invariant I1: two concurrent claims for the same issue, only one wins.
/// Grounded on the scenario "race in issue claim".
#[tokio::test]
#[serial]
async fn try_claim_issue_is_exclusive_per_issue() {
    let Some(store) = test_store().await else { return };

    let first = Execution::builder().issue_id("100").build();
    let second = Execution::builder().issue_id("100").mode(ExecutionMode::Plan).build();

    let won_first = store.try_claim_issue(&first).await.unwrap();
    let won_second = store.try_claim_issue(&second).await.unwrap();

    assert!(won_first);
    assert!(!won_second);

    let running = store.get_running_executions().await.unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, first.id);
}

#[tokio::test]
#[serial]
async fn try_claim_issue_allows_sequential_claims_once_terminal() {
    let Some(store) = test_store().await else { return };

    let mut first = Execution::builder().issue_id("200").build();
    assert!(store.try_claim_issue(&first).await.unwrap());

    first.status = oj_core::ExecutionStatus::Completed;
    store.update_execution(&first).await.unwrap();

    let second = Execution::builder().issue_id("200").build();
    assert!(store.try_claim_issue(&second).await.unwrap());
}

#[tokio::test]
#[serial]
async fn try_claim_issue_different_issues_both_win() {
    let Some(store) = test_store().await else { return };

    let a = Execution::builder().issue_id("300").build();
    let b = Execution::builder().issue_id("301").build();

    assert!(store.try_claim_issue(&a).await.unwrap());
    assert!(store.try_claim_issue(&b).await.unwrap());
}
