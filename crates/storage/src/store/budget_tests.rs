// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use oj_core::{BudgetUsageRecord, Execution};
use serial_test::serial;

use crate::test_harness::test_store;

#[tokio::test]
#[serial]
async fn total_usage_starts_at_zero() {
    let Some(store) = test_store().await else { return };
    let total = store.get_total_budget_usage().await.unwrap();
    assert_eq!(total.tokens_used, 0);
    assert_eq!(total.duration_seconds, 0);
}

#[tokio::test]
#[serial]
async fn total_usage_sums_every_recorded_execution() {
    let Some(store) = test_store().await else { return };

    let exec_a = Execution::builder().issue_id("60").build();
    let exec_b = Execution::builder().issue_id("61").build();
    store.create_execution(&exec_a).await.unwrap();
    store.create_execution(&exec_b).await.unwrap();

    store
        .record_budget_usage(&BudgetUsageRecord { execution_id: exec_a.id, tokens_used: 1000, duration_seconds: 60, recorded_at: Utc::now() })
        .await
        .unwrap();
    store
        .record_budget_usage(&BudgetUsageRecord { execution_id: exec_b.id, tokens_used: 2500, duration_seconds: 120, recorded_at: Utc::now() })
        .await
        .unwrap();

    let total = store.get_total_budget_usage().await.unwrap();
    assert_eq!(total.tokens_used, 3500);
    assert_eq!(total.duration_seconds, 180);
}
