// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Applies [`oj_core::Effect`]s produced by the scheduler and control loop.
//!
//! Kept separate from the decision logic so `dry_run` deployments can log
//! intent instead of calling out to the tracker or compute backend, and so
//! tests can assert on the effects a handler *decided* on without needing
//! a live tracker. Store-only effects (classification, bookkeeping) always
//! execute — they're internal, not "outbound mutations" — only tracker and
//! compute-backend calls are suppressed under `dry_run`.

use std::io::Write;

use oj_core::{Effect, ExecutionId, ExecutionStatus, NudgeId};

use crate::context::AppContext;
use crate::error::EngineError;
use crate::launch::{launch, LaunchRequest};

pub(crate) fn issue_number(issue_id: &str) -> Result<i64, EngineError> {
    issue_id.parse().map_err(|_| EngineError::MalformedIssueId(issue_id.to_string()))
}

pub async fn apply_effect<C: oj_core::Clock>(ctx: &AppContext<C>, effect: Effect) -> Result<(), EngineError> {
    if effect.verbose() {
        tracing::debug!(effect = effect.name(), fields = ?effect.fields(), "applying effect");
    } else {
        tracing::info!(effect = effect.name(), fields = ?effect.fields(), "applying effect");
    }

    match effect {
        Effect::LaunchAgent { issue_id, repo, mode, context, .. } => {
            let prompt = context.unwrap_or_default();
            if ctx.config.dry_run {
                log_dry_run(ctx, &format!("would launch {mode} agent for {repo}#{issue_id}"));
                return Ok(());
            }
            launch(ctx, LaunchRequest { issue_id, repo_url: repo, mode, prompt }).await?;
            Ok(())
        }
        Effect::TransitionLabel { repo, issue_id, label } => {
            if ctx.config.dry_run {
                log_dry_run(ctx, &format!("would transition {repo}#{issue_id} to {label}"));
                return Ok(());
            }
            let number = issue_number(&issue_id)?;
            ctx.tracker.set_label(&repo, number, &label).await?;
            Ok(())
        }
        Effect::PostComment { repo, issue_id, body } => {
            if ctx.config.dry_run {
                log_dry_run(ctx, &format!("would comment on {repo}#{issue_id}: {body}"));
                return Ok(());
            }
            let number = issue_number(&issue_id)?;
            ctx.tracker.post_comment(&repo, number, &body).await?;
            Ok(())
        }
        Effect::CloseIssue { repo, issue_id } => {
            if ctx.config.dry_run {
                log_dry_run(ctx, &format!("would close {repo}#{issue_id}"));
                return Ok(());
            }
            let number = issue_number(&issue_id)?;
            ctx.tracker.update_issue_status(&repo, number, true).await?;
            Ok(())
        }
        Effect::RecordClassification { issue_number, repo, category } => {
            ctx.store
                .upsert_issue_state(
                    issue_number,
                    &repo,
                    &oj_core::IssueStatePatch::default()
                        .classification(oj_core::ClassificationCategory::parse(&category).unwrap_or(oj_core::ClassificationCategory::Simple))
                        .last_checked_now(chrono::Utc::now()),
                )
                .await?;
            Ok(())
        }
        Effect::FinalizeExecution { execution_id, succeeded, result, checkpoint } => {
            finalize_execution(ctx, execution_id, succeeded, result, checkpoint).await
        }
        Effect::UpsertIssueState { issue_number, repo, patch } => {
            ctx.store.upsert_issue_state(issue_number, &repo, &patch).await?;
            Ok(())
        }
        Effect::MarkNudgeProcessed { nudge_id } => mark_nudge_processed(ctx, nudge_id).await,
        Effect::AdvanceCursor { key, value } => {
            ctx.store.set_cron_state(&key, value).await?;
            Ok(())
        }
        Effect::CancelRun { external_run_id } => {
            if ctx.config.dry_run {
                log_dry_run(ctx, &format!("would cancel run {external_run_id}"));
                return Ok(());
            }
            ctx.compute.cancel(&external_run_id).await?;
            Ok(())
        }
    }
}

async fn finalize_execution<C: oj_core::Clock>(
    ctx: &AppContext<C>,
    execution_id: ExecutionId,
    succeeded: bool,
    result: Option<String>,
    checkpoint: Option<serde_json::Value>,
) -> Result<(), EngineError> {
    let Some(mut execution) = ctx.store.get_execution(execution_id).await? else {
        return Ok(());
    };
    let now = chrono::Utc::now();
    execution.status = if succeeded { ExecutionStatus::Completed } else { ExecutionStatus::Failed };
    execution.result = result;
    let duration_seconds = execution.elapsed_since_started(now).map(|d| d.num_seconds()).unwrap_or(0);
    execution.completed_at = Some(now);
    if let Some(data) = checkpoint.clone() {
        execution.checkpoint = Some(data.clone());
        let record = oj_core::Checkpoint::new(execution.issue_id.clone(), execution_id, data);
        ctx.store.save_checkpoint(&record).await?;
    }
    ctx.store.update_execution(&execution).await?;
    // No compute backend reports a token count (RunStatus carries neither),
    // so usage tracking here is duration-only until one does.
    ctx.store
        .record_budget_usage(&oj_core::BudgetUsageRecord { execution_id, tokens_used: 0, duration_seconds, recorded_at: now })
        .await?;
    Ok(())
}

async fn mark_nudge_processed<C: oj_core::Clock>(ctx: &AppContext<C>, nudge_id: NudgeId) -> Result<(), EngineError> {
    ctx.store.mark_nudge_processed(nudge_id).await?;
    Ok(())
}

fn log_dry_run<C: oj_core::Clock>(ctx: &AppContext<C>, message: &str) {
    tracing::info!(dry_run = true, "{message}");
    if let Some(path) = &ctx.config.dry_run_output_file {
        if let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_core::Effect;

    #[test]
    fn launch_agent_effect_carries_prompt_in_context() {
        let effect = Effect::LaunchAgent {
            issue_id: "7".into(),
            repo: "acme/widgets".into(),
            mode: oj_core::ExecutionMode::Implement,
            issue_number: Some(7),
            context: Some("implement it".into()),
        };
        assert_eq!(effect.name(), "launch_agent");
    }
}
