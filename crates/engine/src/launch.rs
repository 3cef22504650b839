// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared launch subroutine (§4.4). The sole path to
//! `ComputeBackend::launch_agent` — scheduler handlers and the control
//! loop's launch phases both call this, never the backend directly.

use oj_core::{Event, Execution, ExecutionId, ExecutionMode, ExecutionStatus};

use crate::context::AppContext;
use crate::error::EngineError;
use crate::prompts::{checkpoint_history_section, checkpoint_section};

/// Everything the launch subroutine needs beyond what's already on
/// [`AppContext`]. `prompt` is the mode-specific prompt text built by the
/// caller (title/body/clarification/review body/etc); this subroutine
/// appends the issue's checkpoint history itself, per the "callers don't
/// repeat it here" rule on [`oj_core::Effect::LaunchAgent`]. Review/retry/
/// fix-ci modes get the full history so the agent can see every attempt
/// it's already made; implement/plan modes get only the latest, since
/// there is no "prior attempt" to compare against on a fresh issue.
pub struct LaunchRequest {
    pub issue_id: String,
    pub repo_url: String,
    pub mode: ExecutionMode,
    pub prompt: String,
}

/// Returns `Ok(Some(id))` on a successful launch, `Ok(None)` when no
/// launch was attempted (active execution already exists, or the claim
/// raced and lost — both are silent no-ops per §7's "claim lost" policy).
pub async fn launch<C: oj_core::Clock>(ctx: &AppContext<C>, request: LaunchRequest) -> Result<Option<ExecutionId>, EngineError> {
    let LaunchRequest { issue_id, repo_url, mode, prompt } = request;

    // I4 budget gate: a pre-claim check is sufficient, the claim itself is
    // the authoritative serialization point.
    if let Some(existing) = ctx.store.get_execution_for_issue(&issue_id).await? {
        if existing.status.is_active() {
            tracing::info!(issue_id, "launch skipped: active execution already exists");
            return Ok(None);
        }
    }

    let total = ctx.store.get_running_executions().await?;
    if total.len() as u32 >= ctx.config.max_concurrent_executions {
        tracing::info!(issue_id, "launch skipped: at max_concurrent_executions");
        return Ok(None);
    }

    let shows_history = matches!(mode, ExecutionMode::AddressReview | ExecutionMode::RetryWithFeedback | ExecutionMode::FixCi);
    let (full_prompt, latest_checkpoint_data) = if shows_history {
        let checkpoints = ctx.store.get_all_checkpoints(&issue_id).await?;
        let latest = checkpoints.first().map(|c| c.data.clone());
        (format!("{prompt}{}", checkpoint_history_section(&checkpoints)), latest)
    } else {
        let checkpoint = ctx.store.get_latest_checkpoint(&issue_id).await?;
        let prompt = format!("{prompt}{}", checkpoint_section(checkpoint.as_ref()));
        (prompt, checkpoint.map(|c| c.data))
    };

    let mut execution = Execution::new(&issue_id, &repo_url, mode, full_prompt);
    execution.checkpoint = latest_checkpoint_data;

    // I5: claim-then-launch ordering. The claim must succeed before the
    // compute backend is contacted.
    if !ctx.store.try_claim_issue(&execution).await? {
        tracing::info!(issue_id, "launch skipped: claim lost to a concurrent handler");
        return Ok(None);
    }

    match ctx.compute.launch_agent(&execution).await {
        Ok(external_run_id) => {
            ctx.store.set_external_run_id(execution.id, &external_run_id).await?;
            ctx.bus.publish(Event::AgentStarted { execution_id: execution.id, issue_id: issue_id.clone() });
            tracing::info!(issue_id, execution_id = %execution.id, "agent launched");
            Ok(Some(execution.id))
        }
        Err(err) => {
            // I5: a compute-backend failure after a successful claim marks
            // the execution failed, never abandons it in pending.
            execution.status = ExecutionStatus::Failed;
            execution.result = Some(format!("Launch rejected by compute backend: {err}"));
            ctx.store.update_execution(&execution).await?;
            tracing::error!(issue_id, execution_id = %execution.id, error = %err, "launch rejected");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use oj_adapters::test_support::{fakes, FakeComputeBackend};
    use oj_adapters::{ComputeBackend, IssueDetails, IssueTrackerClient};
    use oj_core::{Checkpoint, Classification, EventBus, FakeClock};
    use oj_storage::test_harness::test_store;

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

    #[tokio::test]
    #[ignore = "requires DATABASE_URL_TEST"]
    async fn launch_claims_and_submits_to_compute_backend() {
        let Some((ctx, _compute)) = context().await else { return };
        let request = LaunchRequest {
            issue_id: "42".to_string(),
            repo_url: "https://github.com/acme/widgets.git".to_string(),
            mode: ExecutionMode::Implement,
            prompt: "implement it".to_string(),
        };
        let id = launch(&ctx, request).await.unwrap();
        assert!(id.is_some());
        let exec = ctx.store.get_execution(id.unwrap()).await.unwrap().unwrap();
        assert_eq!(exec.status, ExecutionStatus::Pending);
        assert!(exec.external_run_id.is_some());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL_TEST"]
    async fn launch_is_noop_when_active_execution_exists() {
        let Some((ctx, _compute)) = context().await else { return };
        let request = LaunchRequest {
            issue_id: "42".to_string(),
            repo_url: "https://github.com/acme/widgets.git".to_string(),
            mode: ExecutionMode::Implement,
            prompt: "implement it".to_string(),
        };
        let first = launch(&ctx, request).await.unwrap();
        assert!(first.is_some());

        let second = launch(
            &ctx,
            LaunchRequest {
                issue_id: "42".to_string(),
                repo_url: "https://github.com/acme/widgets.git".to_string(),
                mode: ExecutionMode::Implement,
                prompt: "implement it again".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL_TEST"]
    async fn launch_rejection_marks_execution_failed() {
        let Some((ctx, compute)) = context().await else { return };
        compute.reject_next_launch("budget exhausted upstream");
        let request = LaunchRequest {
            issue_id: "99".to_string(),
            repo_url: "https://github.com/acme/widgets.git".to_string(),
            mode: ExecutionMode::Implement,
            prompt: "implement it".to_string(),
        };
        let id = launch(&ctx, request).await.unwrap();
        assert!(id.is_none());
        let exec = ctx.store.get_execution_for_issue("99").await.unwrap().unwrap();
        assert_eq!(exec.status, ExecutionStatus::Failed);
        assert!(exec.result.unwrap().contains("Launch rejected"));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL_TEST"]
    async fn review_mode_prompt_carries_full_checkpoint_history() {
        let Some((ctx, _compute)) = context().await else { return };
        let first = launch(
            &ctx,
            LaunchRequest {
                issue_id: "55".to_string(),
                repo_url: "https://github.com/acme/widgets.git".to_string(),
                mode: ExecutionMode::Implement,
                prompt: "implement it".to_string(),
            },
        )
        .await
        .unwrap()
        .unwrap();
        let mut execution = ctx.store.get_execution(first).await.unwrap().unwrap();
        execution.status = ExecutionStatus::Completed;
        ctx.store.update_execution(&execution).await.unwrap();
        ctx.store
            .save_checkpoint(&Checkpoint::new("55", first, serde_json::json!({"context_summary": "wired the client"})))
            .await
            .unwrap();

        let second = launch(
            &ctx,
            LaunchRequest {
                issue_id: "55".to_string(),
                repo_url: "https://github.com/acme/widgets.git".to_string(),
                mode: ExecutionMode::AddressReview,
                prompt: "address review".to_string(),
            },
        )
        .await
        .unwrap()
        .unwrap();
        let exec = ctx.store.get_execution(second).await.unwrap().unwrap();
        assert!(exec.prompt.contains("## Prior attempts"));
        assert!(exec.prompt.contains("wired the client"));
    }
}
