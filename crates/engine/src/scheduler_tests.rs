// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use async_trait::async_trait;
use oj_adapters::test_support::{fakes, FakeComputeBackend, FakeTracker};
use oj_adapters::{ComputeBackend, IssueDetails, IssueTrackerClient};
use oj_core::{Classification, ClassificationCategory, Event, EventBus, ExecutionStatus, FakeClock, IssueStatePatch};
use oj_storage::test_harness::test_store;

use super::*;
use crate::classifier::Classifier;
use crate::config::Config;

/// Returns a fixed classification regardless of the issue, so scenario
/// tests can drive the dispatch-by-category branch directly.
struct ScriptedClassifier(Classification);

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _issue: &IssueDetails, _comments: &[String]) -> Classification {
        self.0.clone()
    }
}

fn simple() -> Classification {
    Classification { category: ClassificationCategory::Simple, reason: "trivial".into(), blocking_question: None, estimated_complexity: 2, dependencies: vec![] }
}

async fn context_with(
    classification: Classification,
) -> Option<(AppContext<FakeClock>, Arc<FakeTracker>, Arc<FakeComputeBackend>)> {
    let store = test_store().await?;
    let (tracker, compute) = fakes();
    let ctx = AppContext::new(
        Arc::new(store),
        Arc::new(EventBus::new(16)),
        tracker.clone() as Arc<dyn IssueTrackerClient>,
        compute.clone() as Arc<dyn ComputeBackend>,
        Arc::new(ScriptedClassifier(classification)),
        FakeClock::new(),
        Arc::new(Config::default()),
    );
    Some((ctx, tracker, compute))
}

fn issue(repo: &str, number: i64, labels: &[&str]) -> IssueDetails {
    IssueDetails {
        number,
        repo: repo.to_string(),
        title: "flaky login test".to_string(),
        body: "the login test fails intermittently".to_string(),
        labels: labels.iter().map(|s| s.to_string()).collect(),
        closed: false,
    }
}

/// S1: two concurrent classify-and-act calls for the same issue race on
/// `try_claim_issue`; exactly one execution row survives.
#[tokio::test]
#[ignore = "requires DATABASE_URL_TEST"]
async fn race_in_issue_claim_yields_exactly_one_execution() {
    let Some((ctx, tracker, _compute)) = context_with(simple()).await else { return };
    tracker.seed_issue(issue("acme/widgets", 42, &["ag/todo"]));

    let (first, second) =
        tokio::join!(classify_and_act(&ctx, "acme/widgets", "42"), classify_and_act(&ctx, "acme/widgets", "42"));
    first.unwrap();
    second.unwrap();

    let executions = ctx.store.list_executions(&oj_storage::ExecutionFilter::default()).await.unwrap();
    let active = executions.iter().filter(|e| e.issue_id == "42" && e.status.is_active()).count();
    assert_eq!(active, 1);
}

/// S4: two `CHECK_RUN_FAILED` events for the same branch and head SHA;
/// only the first launches a fix-ci execution.
#[tokio::test]
#[ignore = "requires DATABASE_URL_TEST"]
async fn ci_fix_deduplicates_by_head_sha() {
    let Some((ctx, tracker, _compute)) = context_with(simple()).await else { return };
    tracker.seed_issue(issue("acme/widgets", 15, &["ag/in-progress"]));

    handle_check_run_failed(&ctx, "acme/widgets", "agent/15", None, "deadbeef", "ci/test", "assertion failed")
        .await
        .unwrap();
    handle_check_run_failed(&ctx, "acme/widgets", "agent/15", None, "deadbeef", "ci/test", "assertion failed")
        .await
        .unwrap();

    let state = ctx.store.get_issue_state(15, "acme/widgets").await.unwrap().unwrap();
    assert_eq!(state.ci_fix_count(), 1);
    assert_eq!(state.last_ci_check_sha(), Some("deadbeef"));

    let executions = ctx.store.list_executions(&oj_storage::ExecutionFilter::default()).await.unwrap();
    assert_eq!(executions.iter().filter(|e| e.issue_id == "15").count(), 1);
}

/// S5: an issue already at `max_retries_per_issue` gets no new execution
/// on `PR_CLOSED(merged=false)`, and transitions to `ag/failed` with a
/// "Max retries" comment.
#[tokio::test]
#[ignore = "requires DATABASE_URL_TEST"]
async fn retry_limit_transitions_to_failed_without_new_execution() {
    let Some((ctx, tracker, _compute)) = context_with(simple()).await else { return };
    tracker.seed_issue(issue("acme/widgets", 7, &["ag/in-progress"]));
    ctx.store
        .upsert_issue_state(7, "acme/widgets", &IssueStatePatch::default().retry_count(ctx.config.max_retries_per_issue))
        .await
        .unwrap();

    handle_pr_closed(&ctx, "acme/widgets", None, 1, "agent/7", false).await.unwrap();

    assert!(tracker.labels("acme/widgets", 7).contains(&"ag/failed".to_string()));
    assert!(tracker.comments("acme/widgets", 7).iter().any(|c| c.body.contains("Max retries")));
    let executions = ctx.store.list_executions(&oj_storage::ExecutionFilter::default()).await.unwrap();
    assert!(executions.iter().all(|e| e.issue_id != "7" || e.status == ExecutionStatus::Completed || e.status == ExecutionStatus::Failed));
}

/// Dispatch routes a `Blocked` classification to `ag/blocked` with an
/// embedded `type=blocked` marker rather than launching an agent.
#[tokio::test]
#[ignore = "requires DATABASE_URL_TEST"]
async fn blocked_classification_posts_marker_comment_without_launch() {
    let blocked = Classification {
        category: ClassificationCategory::Blocked,
        reason: "need a decision on storage backend".into(),
        blocking_question: Some("Postgres or sqlite?".into()),
        estimated_complexity: 4,
        dependencies: vec![],
    };
    let Some((ctx, tracker, compute)) = context_with(blocked).await else { return };
    tracker.seed_issue(issue("acme/widgets", 9, &["ag/todo"]));

    classify_and_act(&ctx, "acme/widgets", "9").await.unwrap();

    assert!(tracker.labels("acme/widgets", 9).contains(&"ag/blocked".to_string()));
    let comments = tracker.comments("acme/widgets", 9);
    assert!(comments.iter().any(|c| c.body.contains("type=blocked") && c.body.contains("Postgres or sqlite?")));
    assert!(compute.launches().is_empty());
}

/// Dispatching an event through the public `dispatch` entry point never
/// panics on a handler error — it logs and swallows, per §7.
#[tokio::test]
#[ignore = "requires DATABASE_URL_TEST"]
async fn dispatch_swallows_handler_errors_for_malformed_issue_id() {
    let Some((ctx, _tracker, _compute)) = context_with(simple()).await else { return };
    dispatch(&ctx, Event::IssueCreated { issue_id: "not-a-number".into(), repo: "acme/widgets".into(), labels: vec!["ag/todo".into()] }).await;
}

/// `AGENT_COMPLETED` finalizes the execution, saves the checkpoint,
/// transitions the label to `ag/review-pending`, and records the run's
/// budget usage — the path the compute-backend poller drives in
/// production.
#[tokio::test]
#[ignore = "requires DATABASE_URL_TEST"]
async fn agent_completed_finalizes_and_records_budget_usage() {
    let Some((ctx, tracker, compute)) = context_with(simple()).await else { return };
    tracker.seed_issue(issue("acme/widgets", 21, &["ag/in-progress"]));

    let mut execution =
        oj_core::Execution::new("21", "https://github.com/acme/widgets.git", oj_core::ExecutionMode::Implement, "implement it");
    ctx.store.try_claim_issue(&execution).await.unwrap();
    let run_id = compute.launch_agent(&execution).await.unwrap();
    ctx.store.set_external_run_id(execution.id, &run_id).await.unwrap();
    execution.external_run_id = Some(run_id);

    dispatch(
        &ctx,
        Event::AgentCompleted {
            execution_id: execution.id,
            result: Some("PR opened".into()),
            checkpoint: Some(serde_json::json!({"context_summary": "wired the client"})),
        },
    )
    .await;

    let finalized = ctx.store.get_execution(execution.id).await.unwrap().unwrap();
    assert_eq!(finalized.status, ExecutionStatus::Completed);
    assert_eq!(finalized.result.as_deref(), Some("PR opened"));
    assert!(tracker.labels("acme/widgets", 21).contains(&"ag/review-pending".to_string()));

    let checkpoint = ctx.store.get_latest_checkpoint("21").await.unwrap().unwrap();
    assert_eq!(checkpoint.context_summary(), Some("wired the client"));

    let usage = ctx.store.get_total_budget_usage().await.unwrap();
    assert!(usage.duration_seconds >= 0);
}
