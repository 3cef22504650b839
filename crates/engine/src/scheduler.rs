// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The issue-lifecycle scheduler (§4.4): one handler per event kind, all
//! sharing the classify-and-act subroutine and the launch subroutine in
//! [`crate::launch`]. Subscribes to every event on the bus; each handler
//! is independent and a failure in one is logged and dropped rather than
//! propagated, per §7's propagation rule — every handler is replayable on
//! the next periodic cycle or webhook redelivery.
//!
//! `ISSUE_COMMENT` has no dedicated [`oj_core::Event`] variant — the
//! unblock-via-human-reply flow it drives is instead covered by the
//! control loop's unblocked sweep (§4.5 phase 6), which this module's
//! [`launch_unblocked`] also backs.

use std::sync::Arc;

use oj_adapters::{agent_branch_issue_number, parse_owner_repo, IssueDetails};
use oj_core::{
    is_handled_label, is_trigger_label, Clock, Effect, Event, EventBus, ExecutionId, ExecutionMode, IssueStatePatch, NudgeId,
    PrReviewState,
};

use crate::context::AppContext;
use crate::effects::{apply_effect, issue_number};
use crate::error::EngineError;
use crate::prompts;

/// Register the scheduler as the sole catch-all subscriber on `ctx.bus`.
/// Returns the subscription id in case a caller wants to unsubscribe (the
/// daemon never does; tests may).
pub fn subscribe<C: Clock + 'static>(ctx: AppContext<C>) -> oj_core::SubscriptionId {
    let ctx = Arc::new(ctx);
    ctx.bus.subscribe(
        None,
        Arc::new(move |event: Event| {
            let ctx = ctx.clone();
            Box::pin(async move { dispatch(&ctx, event).await })
        }),
    )
}

/// Route one event to its handler, logging and swallowing any error —
/// the scheduler never lets one bad event wedge the consumer task.
pub async fn dispatch<C: Clock>(ctx: &AppContext<C>, event: Event) {
    let summary = event.log_summary();
    if let Err(err) = handle_event(ctx, event).await {
        tracing::error!(event = %summary, error = %err, "scheduler handler failed, dropping event");
    }
}

async fn handle_event<C: Clock>(ctx: &AppContext<C>, event: Event) -> Result<(), EngineError> {
    match event {
        Event::IssueCreated { issue_id, repo, labels } => handle_issue_labels(ctx, &repo, &issue_id, &labels).await,
        Event::IssueUpdated { issue_id, repo, action, labels } => {
            if action == "labeled" {
                handle_issue_labels(ctx, &repo, &issue_id, &labels).await
            } else {
                Ok(())
            }
        }
        Event::NudgeRequested { nudge_id, issue_id, repo, source_execution_id, reason, .. } => {
            handle_nudge_requested(ctx, &nudge_id, &issue_id, repo, source_execution_id, reason).await
        }
        Event::PrReview { repo, issue_id, pr_number, branch, state, body } => {
            handle_pr_review(ctx, &repo, issue_id, pr_number, &branch, state, &body).await
        }
        Event::PrClosed { repo, issue_id, pr_number, branch, merged } => {
            handle_pr_closed(ctx, &repo, issue_id, pr_number, &branch, merged).await
        }
        Event::CheckRunFailed { repo, branch, pr_number, head_sha, check_name, check_output, .. } => {
            handle_check_run_failed(ctx, &repo, &branch, pr_number, &head_sha, &check_name, &check_output).await
        }
        Event::AgentStarted { .. } => Ok(()),
        Event::AgentCompleted { execution_id, result, checkpoint } => {
            handle_agent_completed(ctx, execution_id, result, checkpoint).await
        }
        Event::AgentFailed { execution_id, error } => handle_agent_failed(ctx, execution_id, error).await,
        Event::Custom => Ok(()),
    }
}

pub(crate) async fn has_capacity<C: Clock>(ctx: &AppContext<C>) -> Result<bool, EngineError> {
    let running = ctx.store.get_running_executions().await?;
    Ok((running.len() as u32) < ctx.config.max_concurrent_executions)
}

async fn handle_issue_labels<C: Clock>(ctx: &AppContext<C>, repo: &str, issue_id: &str, labels: &[String]) -> Result<(), EngineError> {
    if labels.iter().any(|l| is_trigger_label(l)) && !labels.iter().any(|l| is_handled_label(l)) {
        classify_and_act(ctx, repo, issue_id).await?;
    }
    Ok(())
}

/// The classify-and-act subroutine (§4.4): budget gate, fetch, classify,
/// persist, dispatch on category. Shared with the control loop's scan
/// phase (§4.5 phase 2), which runs the identical logic per candidate.
pub(crate) async fn classify_and_act<C: Clock>(ctx: &AppContext<C>, repo: &str, issue_id: &str) -> Result<(), EngineError> {
    if !has_capacity(ctx).await? {
        tracing::info!(repo, issue_id, "classify-and-act skipped: at max_concurrent_executions");
        return Ok(());
    }

    let number = issue_number(issue_id)?;
    let issue = ctx.tracker.get_issue(repo, number).await?;
    let comments = ctx.tracker.list_comments(repo, number).await?;
    let comment_bodies: Vec<String> = comments.into_iter().map(|c| c.body).collect();

    let classification = ctx.classifier.classify(&issue, &comment_bodies).await;

    apply_effect(
        ctx,
        Effect::RecordClassification { issue_number: number, repo: repo.to_string(), category: classification.category.to_string() },
    )
    .await?;

    use oj_core::ClassificationCategory::*;
    match classification.category {
        Simple => {
            apply_effect(ctx, transition(repo, issue_id, "ag/in-progress")).await?;
            launch_implement(ctx, repo, issue_id, &issue).await
        }
        Complex => {
            apply_effect(ctx, transition(repo, issue_id, "ag/planning")).await?;
            launch_plan(ctx, repo, issue_id, &issue).await
        }
        Blocked => {
            apply_effect(ctx, transition(repo, issue_id, "ag/blocked")).await?;
            let question = classification.blocking_question.unwrap_or_else(|| classification.reason.clone());
            let body = format!("{question}\n\n<!-- type=blocked -->");
            apply_effect(ctx, Effect::PostComment { repo: repo.to_string(), issue_id: issue_id.to_string(), body }).await
        }
        Skip => {
            apply_effect(ctx, transition(repo, issue_id, "ag/skipped")).await?;
            apply_effect(ctx, Effect::PostComment { repo: repo.to_string(), issue_id: issue_id.to_string(), body: classification.reason })
                .await
        }
    }
}

fn transition(repo: &str, issue_id: &str, label: &str) -> Effect {
    Effect::TransitionLabel { repo: repo.to_string(), issue_id: issue_id.to_string(), label: label.to_string() }
}

async fn launch_implement<C: Clock>(ctx: &AppContext<C>, repo: &str, issue_id: &str, issue: &IssueDetails) -> Result<(), EngineError> {
    let prompt = prompts::implement_prompt(issue.number, &issue.title, &issue.body, None);
    apply_effect(
        ctx,
        Effect::LaunchAgent {
            issue_id: issue_id.to_string(),
            repo: repo.to_string(),
            mode: ExecutionMode::Implement,
            issue_number: Some(issue.number),
            context: Some(prompt),
        },
    )
    .await
}

async fn launch_plan<C: Clock>(ctx: &AppContext<C>, repo: &str, issue_id: &str, issue: &IssueDetails) -> Result<(), EngineError> {
    let prompt = prompts::plan_prompt(issue.number, &issue.title, &issue.body);
    apply_effect(
        ctx,
        Effect::LaunchAgent {
            issue_id: issue_id.to_string(),
            repo: repo.to_string(),
            mode: ExecutionMode::Plan,
            issue_number: Some(issue.number),
            context: Some(prompt),
        },
    )
    .await
}

pub(crate) async fn launch_unblocked<C: Clock>(
    ctx: &AppContext<C>,
    repo: &str,
    issue_id: &str,
    issue: &IssueDetails,
    clarification: &str,
) -> Result<(), EngineError> {
    let prompt = prompts::unblocked_prompt(issue.number, &issue.title, &issue.body, clarification, None);
    apply_effect(ctx, transition(repo, issue_id, "ag/in-progress")).await?;
    apply_effect(
        ctx,
        Effect::LaunchAgent {
            issue_id: issue_id.to_string(),
            repo: repo.to_string(),
            mode: ExecutionMode::Implement,
            issue_number: Some(issue.number),
            context: Some(prompt),
        },
    )
    .await
}

pub(crate) async fn launch_address_review<C: Clock>(
    ctx: &AppContext<C>,
    repo: &str,
    issue_id: &str,
    issue_num: i64,
    pr_number: i64,
    review_body: &str,
) -> Result<(), EngineError> {
    let prompt = prompts::address_review_prompt(issue_num, pr_number, review_body, None);
    apply_effect(
        ctx,
        Effect::LaunchAgent {
            issue_id: issue_id.to_string(),
            repo: repo.to_string(),
            mode: ExecutionMode::AddressReview,
            issue_number: Some(issue_num),
            context: Some(prompt),
        },
    )
    .await
}

pub(crate) async fn launch_retry<C: Clock>(ctx: &AppContext<C>, repo: &str, issue_id: &str, issue_num: i64, feedback: &str) -> Result<(), EngineError> {
    let prompt = prompts::retry_with_feedback_prompt(issue_num, feedback, None);
    apply_effect(
        ctx,
        Effect::LaunchAgent {
            issue_id: issue_id.to_string(),
            repo: repo.to_string(),
            mode: ExecutionMode::RetryWithFeedback,
            issue_number: Some(issue_num),
            context: Some(prompt),
        },
    )
    .await
}

pub(crate) async fn launch_fix_ci<C: Clock>(
    ctx: &AppContext<C>,
    repo: &str,
    issue_id: &str,
    issue_num: i64,
    branch: &str,
    check_name: &str,
    check_output: &str,
) -> Result<(), EngineError> {
    let prompt = prompts::fix_ci_prompt(issue_num, branch, check_name, check_output, None);
    apply_effect(
        ctx,
        Effect::LaunchAgent {
            issue_id: issue_id.to_string(),
            repo: repo.to_string(),
            mode: ExecutionMode::FixCi,
            issue_number: Some(issue_num),
            context: Some(prompt),
        },
    )
    .await
}

async fn handle_nudge_requested<C: Clock>(
    ctx: &AppContext<C>,
    nudge_id: &str,
    issue_id: &str,
    repo: Option<String>,
    source_execution_id: Option<ExecutionId>,
    reason: Option<String>,
) -> Result<(), EngineError> {
    let resolved_repo = match repo {
        Some(repo) => Some(repo),
        None => resolve_repo_from_execution(ctx, source_execution_id).await?,
    };

    let Some(repo) = resolved_repo else {
        tracing::info!(nudge_id, issue_id, "nudge dropped: could not resolve target repo");
        apply_effect(ctx, Effect::MarkNudgeProcessed { nudge_id: NudgeId::from_string(nudge_id) }).await?;
        return Ok(());
    };

    let number = issue_number(issue_id)?;
    let issue = ctx.tracker.get_issue(&repo, number).await?;
    tracing::info!(repo, issue_id, reason = reason.as_deref().unwrap_or(""), "nudge requested implement launch");
    launch_implement(ctx, &repo, issue_id, &issue).await?;
    apply_effect(ctx, Effect::MarkNudgeProcessed { nudge_id: NudgeId::from_string(nudge_id) }).await
}

async fn resolve_repo_from_execution<C: Clock>(
    ctx: &AppContext<C>,
    source_execution_id: Option<ExecutionId>,
) -> Result<Option<String>, EngineError> {
    let Some(execution_id) = source_execution_id else { return Ok(None) };
    let execution = ctx.store.get_execution(execution_id).await?;
    Ok(execution.and_then(|e| parse_owner_repo(&e.repo_url)))
}

/// Drains up to 5 pending nudges (§4.4's `AGENT_COMPLETED`/`AGENT_FAILED`
/// follow-up); each is resolved against its source execution's repo since
/// these were queued rather than carried on the bus.
pub async fn process_pending_nudges<C: Clock>(ctx: &AppContext<C>) -> Result<(), EngineError> {
    let nudges = ctx.store.get_pending_nudges(5).await?;
    for nudge in nudges {
        let repo = resolve_repo_from_execution(ctx, nudge.source_execution_id).await?;
        match repo {
            Some(repo) => match issue_number(&nudge.issue_id) {
                Ok(number) => {
                    let issue = ctx.tracker.get_issue(&repo, number).await?;
                    launch_implement(ctx, &repo, &nudge.issue_id, &issue).await?;
                }
                Err(err) => tracing::warn!(nudge_id = %nudge.id, error = %err, "skipping malformed nudge"),
            },
            None => tracing::info!(nudge_id = %nudge.id, "nudge dropped: could not resolve target repo"),
        }
        apply_effect(ctx, Effect::MarkNudgeProcessed { nudge_id: nudge.id }).await?;
    }
    Ok(())
}

async fn handle_pr_review<C: Clock>(
    ctx: &AppContext<C>,
    repo: &str,
    issue_id: Option<String>,
    pr_number: i64,
    branch: &str,
    state: PrReviewState,
    body: &str,
) -> Result<(), EngineError> {
    if !matches!(state, PrReviewState::ChangesRequested | PrReviewState::Commented) || body.trim().is_empty() {
        return Ok(());
    }
    let Some(number) = agent_branch_issue_number(branch).or_else(|| issue_id.as_deref().and_then(|s| s.parse().ok())) else {
        return Ok(());
    };
    let issue_id_str = number.to_string();
    launch_address_review(ctx, repo, &issue_id_str, number, pr_number, body).await
}

async fn handle_pr_closed<C: Clock>(
    ctx: &AppContext<C>,
    repo: &str,
    issue_id: Option<String>,
    _pr_number: i64,
    branch: &str,
    merged: bool,
) -> Result<(), EngineError> {
    let Some(number) = agent_branch_issue_number(branch).or_else(|| issue_id.as_deref().and_then(|s| s.parse().ok())) else {
        return Ok(());
    };
    let issue_id_str = number.to_string();

    if merged {
        apply_effect(ctx, transition(repo, &issue_id_str, "ag/done")).await?;
        return apply_effect(ctx, Effect::CloseIssue { repo: repo.to_string(), issue_id: issue_id_str }).await;
    }

    let state = ctx.store.get_issue_state(number, repo).await?;
    let retry_count = state.map(|s| s.retry_count).unwrap_or(0);

    if retry_count < ctx.config.max_retries_per_issue {
        apply_effect(
            ctx,
            Effect::UpsertIssueState {
                issue_number: number,
                repo: repo.to_string(),
                patch: IssueStatePatch::default().retry_count(retry_count + 1),
            },
        )
        .await?;
        launch_retry(ctx, repo, &issue_id_str, number, "The previous pull request was closed without merging.").await
    } else {
        apply_effect(ctx, transition(repo, &issue_id_str, "ag/failed")).await?;
        let body = format!(
            "Max retries ({}) reached without a successful merge. Manual intervention is required.",
            ctx.config.max_retries_per_issue
        );
        apply_effect(ctx, Effect::PostComment { repo: repo.to_string(), issue_id: issue_id_str, body }).await
    }
}

async fn handle_check_run_failed<C: Clock>(
    ctx: &AppContext<C>,
    repo: &str,
    branch: &str,
    _pr_number: Option<i64>,
    head_sha: &str,
    check_name: &str,
    check_output: &str,
) -> Result<(), EngineError> {
    let Some(number) = agent_branch_issue_number(branch) else { return Ok(()) };
    let issue_id_str = number.to_string();

    let state = ctx.store.get_issue_state(number, repo).await?;
    if state.as_ref().and_then(|s| s.last_ci_check_sha()).is_some_and(|sha| sha == head_sha) {
        tracing::info!(repo, issue_id = %issue_id_str, head_sha, "check-run failure deduplicated, same head sha already handled");
        return Ok(());
    }
    let ci_fix_count = state.as_ref().map(|s| s.ci_fix_count()).unwrap_or(0);

    if ci_fix_count < ctx.config.max_ci_fix_retries as i64 {
        apply_effect(
            ctx,
            Effect::UpsertIssueState {
                issue_number: number,
                repo: repo.to_string(),
                patch: IssueStatePatch::default()
                    .merge_metadata(serde_json::json!({"ci_fix_count": ci_fix_count + 1, "last_ci_check_sha": head_sha})),
            },
        )
        .await?;
        launch_fix_ci(ctx, repo, &issue_id_str, number, branch, check_name, check_output).await
    } else {
        let body = format!(
            "Automatic CI-fix attempts exhausted ({}/{}) on `{check_name}`. Manual intervention is required.",
            ctx.config.max_ci_fix_retries, ctx.config.max_ci_fix_retries
        );
        apply_effect(ctx, Effect::PostComment { repo: repo.to_string(), issue_id: issue_id_str.clone(), body }).await?;
        apply_effect(ctx, transition(repo, &issue_id_str, "ag/failed")).await
    }
}

async fn handle_agent_completed<C: Clock>(
    ctx: &AppContext<C>,
    execution_id: ExecutionId,
    result: Option<String>,
    checkpoint: Option<serde_json::Value>,
) -> Result<(), EngineError> {
    apply_effect(ctx, Effect::FinalizeExecution { execution_id, succeeded: true, result, checkpoint }).await?;
    if let Some(execution) = ctx.store.get_execution(execution_id).await? {
        if let Some(repo) = parse_owner_repo(&execution.repo_url) {
            apply_effect(ctx, transition(&repo, &execution.issue_id, "ag/review-pending")).await?;
        }
    }
    process_pending_nudges(ctx).await
}

async fn handle_agent_failed<C: Clock>(ctx: &AppContext<C>, execution_id: ExecutionId, error: Option<String>) -> Result<(), EngineError> {
    apply_effect(ctx, Effect::FinalizeExecution { execution_id, succeeded: false, result: error, checkpoint: None }).await?;
    if let Some(execution) = ctx.store.get_execution(execution_id).await? {
        if let Some(repo) = parse_owner_repo(&execution.repo_url) {
            apply_effect(ctx, transition(&repo, &execution.issue_id, "ag/failed")).await?;
        }
    }
    process_pending_nudges(ctx).await
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
