// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One function per [`Request`] variant, each translating store/engine
//! calls into a [`Response`].

use oj_core::{Clock, ExecutionId, NudgeRequest};
use oj_engine::AppContext;
use oj_storage::ExecutionFilter;
use oj_wire::{BudgetStatusSummary, ExecutionSummary, IssueStateSummary, NudgeSummary, Request, Response, StatusSummary};

use super::error_response;

pub(crate) async fn handle<C: Clock>(ctx: &AppContext<C>, request: Request) -> Response {
    match request {
        Request::Status => status(ctx).await,
        Request::ListExecutions { filter } => list_executions(ctx, filter).await,
        Request::GetExecution { execution_id } => get_execution(ctx, execution_id).await,
        Request::ListIssueStates { repo, classification } => list_issue_states(ctx, repo, classification).await,
        Request::TriggerNudge { issue_id, reason } => trigger_nudge(ctx, issue_id, reason).await,
        Request::CancelExecution { execution_id } => cancel_execution(ctx, execution_id).await,
        Request::RunControlLoopOnce => {
            oj_engine::control_loop::run_once(ctx).await;
            Response::Ack
        }
        Request::BudgetStatus => budget_status(ctx).await,
        Request::Shutdown => Response::Ack,
    }
}

async fn budget_status<C: Clock>(ctx: &AppContext<C>) -> Response {
    match oj_engine::budget::get_budget_status(ctx).await {
        Ok(usage) => Response::Budget(BudgetStatusSummary { tokens_used: usage.tokens_used, duration_seconds: usage.duration_seconds }),
        Err(err) => error_response(err),
    }
}

async fn status<C: Clock>(ctx: &AppContext<C>) -> Response {
    let running = match ctx.store.get_running_executions().await {
        Ok(rows) => rows.len(),
        Err(err) => return error_response(err),
    };
    let pending_nudges = match ctx.store.get_pending_nudges(i64::MAX).await {
        Ok(rows) => rows.len(),
        Err(err) => return error_response(err),
    };
    Response::Status(StatusSummary {
        running_executions: running,
        pending_nudges,
        dry_run: ctx.config.dry_run,
        deployment_mode: format!("{:?}", ctx.config.deployment_mode).to_lowercase(),
    })
}

async fn list_executions<C: Clock>(ctx: &AppContext<C>, filter: oj_wire::ExecutionListFilter) -> Response {
    let store_filter = ExecutionFilter {
        issue_id: filter.issue_id,
        repo_url: None,
        status: filter.status.as_deref().and_then(oj_core::ExecutionStatus::parse),
        mode: None,
    };
    match ctx.store.list_executions(&store_filter).await {
        Ok(rows) => {
            let mut rows = rows;
            if let Some(limit) = filter.limit {
                rows.truncate(limit.max(0) as usize);
            }
            Response::Executions(rows.iter().map(to_summary).collect())
        }
        Err(err) => error_response(err),
    }
}

async fn get_execution<C: Clock>(ctx: &AppContext<C>, execution_id: String) -> Response {
    match ctx.store.get_execution(ExecutionId::from_string(execution_id)).await {
        Ok(exec) => Response::Execution(exec.as_ref().map(to_summary)),
        Err(err) => error_response(err),
    }
}

async fn list_issue_states<C: Clock>(ctx: &AppContext<C>, repo: String, classification: Option<String>) -> Response {
    let classification = classification.and_then(|c| oj_core::ClassificationCategory::parse(&c));
    match ctx.store.list_issue_states(&repo, classification).await {
        Ok(rows) => Response::IssueStates(
            rows.iter()
                .map(|s| IssueStateSummary {
                    issue_number: s.issue_number,
                    repo: s.repo.clone(),
                    classification: s.classification.map(|c| c.to_string()),
                    retry_count: s.retry_count,
                    updated_at: s.updated_at.to_rfc3339(),
                })
                .collect(),
        ),
        Err(err) => error_response(err),
    }
}

async fn trigger_nudge<C: Clock>(ctx: &AppContext<C>, issue_id: String, reason: Option<String>) -> Response {
    let mut nudge = NudgeRequest::new(issue_id);
    if let Some(reason) = reason {
        nudge = nudge.reason(reason);
    }
    match ctx.store.create_nudge(&nudge).await {
        Ok(()) => Response::NudgeQueued(NudgeSummary {
            id: nudge.id.to_string(),
            issue_id: nudge.issue_id,
            priority: nudge.priority,
            reason: nudge.reason,
        }),
        Err(err) => error_response(err),
    }
}

async fn cancel_execution<C: Clock>(ctx: &AppContext<C>, execution_id: String) -> Response {
    let id = ExecutionId::from_string(execution_id);
    let mut exec = match ctx.store.get_execution(id).await {
        Ok(Some(exec)) => exec,
        Ok(None) => return error_response(format!("no such execution: {id}")),
        Err(err) => return error_response(err),
    };

    if let Some(handle) = exec.external_run_id.clone() {
        if let Err(err) = ctx.compute.cancel(&handle).await {
            return error_response(err);
        }
    }

    exec.status = oj_core::ExecutionStatus::Failed;
    exec.completed_at = Some(chrono::Utc::now());
    match ctx.store.update_execution(&exec).await {
        Ok(()) => Response::Ack,
        Err(err) => error_response(err),
    }
}

fn to_summary(exec: &oj_core::Execution) -> ExecutionSummary {
    ExecutionSummary {
        id: exec.id.to_string(),
        issue_id: exec.issue_id.clone(),
        repo_url: exec.repo_url.clone(),
        status: exec.status.to_string(),
        mode: exec.mode.to_string(),
        external_run_id: exec.external_run_id.clone(),
        created_at: exec.created_at.to_rfc3339(),
        started_at: exec.started_at.map(|t| t.to_rfc3339()),
        completed_at: exec.completed_at.map(|t| t.to_rfc3339()),
    }
}
