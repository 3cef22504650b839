// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use oj_core::NudgeRequest;
use serial_test::serial;

use crate::test_harness::test_store;

#[tokio::test]
#[serial]
async fn pending_nudges_ordered_by_priority_then_age() {
    let Some(store) = test_store().await else { return };

    let low = NudgeRequest::new("1").priority(0);
    let high = NudgeRequest::new("2").priority(10);
    store.create_nudge(&low).await.unwrap();
    store.create_nudge(&high).await.unwrap();

    let pending = store.get_pending_nudges(10).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, high.id);
    assert_eq!(pending[1].id, low.id);
}

#[tokio::test]
#[serial]
async fn marking_processed_removes_from_pending() {
    let Some(store) = test_store().await else { return };

    let nudge = NudgeRequest::new("3");
    store.create_nudge(&nudge).await.unwrap();
    store.mark_nudge_processed(nudge.id).await.unwrap();

    let pending = store.get_pending_nudges(10).await.unwrap();
    assert!(pending.is_empty());
}
