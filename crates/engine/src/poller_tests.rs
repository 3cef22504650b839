// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use async_trait::async_trait;
use oj_adapters::test_support::{fakes, FakeComputeBackend};
use oj_adapters::{ComputeBackend, IssueDetails, IssueTrackerClient};
use oj_core::{Classification, Event, EventBus, Execution, ExecutionMode, FakeClock};
use oj_storage::test_harness::test_store;
use parking_lot::Mutex;

use super::*;
use crate::classifier::Classifier;
use crate::config::Config;

struct StaticClassifier;

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(&self, _issue: &IssueDetails, _comments: &[String]) -> Classification {
        Classification::parse_error()
    }
}

async fn context() -> Option<(AppContext<FakeClock>, Arc<FakeComputeBackend>)> {
    let store = test_store().await?;
    let (tracker, compute) = fakes();
    let ctx = AppContext::new(
        Arc::new(store),
        Arc::new(EventBus::new(16)),
        tracker as Arc<dyn IssueTrackerClient>,
        compute.clone() as Arc<dyn ComputeBackend>,
        Arc::new(StaticClassifier),
        FakeClock::new(),
        Arc::new(Config::default()),
    );
    Some((ctx, compute))
}

async fn claimed_execution<C: oj_core::Clock>(ctx: &AppContext<C>, compute: &FakeComputeBackend, issue_id: &str) -> Execution {
    let mut execution = Execution::new(issue_id, "https://github.com/acme/widgets.git", ExecutionMode::Implement, "implement it");
    assert!(ctx.store.try_claim_issue(&execution).await.unwrap());
    let run_id = compute.launch_agent(&execution).await.unwrap();
    ctx.store.set_external_run_id(execution.id, &run_id).await.unwrap();
    execution.external_run_id = Some(run_id);
    execution
}

fn recording_subscriber(bus: &EventBus) -> Arc<Mutex<Vec<Event>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = seen.clone();
    bus.subscribe(
        None,
        Arc::new(move |event: Event| {
            let seen = seen2.clone();
            Box::pin(async move { seen.lock().push(event) })
        }),
    );
    bus.start();
    seen
}

#[tokio::test]
#[ignore = "requires DATABASE_URL_TEST"]
async fn completed_run_publishes_agent_completed() {
    let Some((ctx, compute)) = context().await else { return };
    let execution = claimed_execution(&ctx, &compute, "77").await;
    compute.complete(execution.external_run_id.as_deref().unwrap(), Some("done"));
    let seen = recording_subscriber(&ctx.bus);

    run_once(&ctx).await;
    ctx.bus.wait_until_empty().await;

    let events = seen.lock();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::AgentCompleted { execution_id, result, .. } if *execution_id == execution.id && result.as_deref() == Some("done")
    )));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL_TEST"]
async fn failed_run_publishes_agent_failed() {
    let Some((ctx, compute)) = context().await else { return };
    let execution = claimed_execution(&ctx, &compute, "78").await;
    compute.fail(execution.external_run_id.as_deref().unwrap(), Some("boom"));
    let seen = recording_subscriber(&ctx.bus);

    run_once(&ctx).await;
    ctx.bus.wait_until_empty().await;

    let events = seen.lock();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::AgentFailed { execution_id, error } if *execution_id == execution.id && error.as_deref() == Some("boom"))));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL_TEST"]
async fn still_running_run_publishes_nothing() {
    let Some((ctx, compute)) = context().await else { return };
    let _execution = claimed_execution(&ctx, &compute, "79").await;
    let seen = recording_subscriber(&ctx.bus);

    run_once(&ctx).await;
    ctx.bus.wait_until_empty().await;

    assert!(seen.lock().is_empty());
}
