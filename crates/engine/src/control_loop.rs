// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The periodic control loop (§4.5): seven best-effort phases run in
//! order on a fixed interval, sharing the scheduler's classify-and-act
//! and launch subroutines so the two call sites never diverge in
//! behavior. A phase's failure is logged and does not prevent the
//! remaining phases in the same cycle from running.
//!
//! Scoped to `config.target_repo` — the one-repo-per-deployment model
//! (§1 Out of scope) means every phase either has one repo to sweep or,
//! absent that configuration, is a no-op.

use std::time::Duration;

use oj_adapters::{agent_branch_issue_number, IssueDetails, ReviewState};
use oj_core::{is_handled_label, is_trigger_label, Clock, IssueStatePatch};

use crate::context::AppContext;
use crate::error::EngineError;
use crate::scheduler;

const LAST_PR_CHECK: &str = "last_pr_check";
const LAST_CLOSED_PR_CHECK: &str = "last_closed_pr_check";

/// Startle delay (§4.5) before the first cycle, letting the webhook
/// deduplicator and scheduler subscriptions settle after daemon startup.
pub const STARTUP_DELAY: Duration = Duration::from_secs(10);

/// Run one full cycle: all seven phases, in order, each independently
/// fault-tolerant. Exposed unscoped by any feature flag so integration
/// tests can drive exactly one cycle deterministically.
pub async fn run_once<C: Clock>(ctx: &AppContext<C>) {
    run_phase(ctx, "scan_and_classify", scan_and_classify).await;
    run_phase(ctx, "timeout_sweep", timeout_sweep).await;
    run_phase(ctx, "pr_review_sweep", pr_review_sweep).await;
    run_phase(ctx, "closed_pr_sweep", closed_pr_sweep).await;
    run_phase(ctx, "unblocked_sweep", unblocked_sweep).await;
    run_phase(ctx, "dependency_sweep", dependency_sweep).await;
}

/// Spawns the recurring loop: a fixed startle delay, then a tick every
/// `management_loop_interval_seconds`. Runs until the returned task is
/// aborted (the daemon aborts it on graceful shutdown).
pub fn spawn<C: Clock + Send + Sync + 'static>(ctx: AppContext<C>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(STARTUP_DELAY).await;
        let mut interval = tokio::time::interval(Duration::from_secs(ctx.config.management_loop_interval_seconds));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            tracing::info!("control loop cycle starting");
            run_once(&ctx).await;
            tracing::info!("control loop cycle complete");
        }
    })
}

async fn run_phase<C, F, Fut>(ctx: &AppContext<C>, name: &'static str, phase: F)
where
    C: Clock,
    F: FnOnce(&AppContext<C>) -> Fut,
    Fut: std::future::Future<Output = Result<(), EngineError>>,
{
    if let Err(err) = phase(ctx).await {
        tracing::error!(phase = name, error = %err, "control loop phase failed, continuing to next phase");
    }
}

/// Phases 1+2: scan for untouched trigger-labeled issues, classify-and-act
/// on each, stopping once the concurrency budget is exhausted.
async fn scan_and_classify<C: Clock>(ctx: &AppContext<C>) -> Result<(), EngineError> {
    let Some(repo) = ctx.config.target_repo.clone() else { return Ok(()) };
    let candidates = ctx.tracker.list_issues(&repo, &[]).await?;
    for issue in candidates {
        if !scheduler::has_capacity(ctx).await? {
            tracing::info!(repo, "scan stopped: at max_concurrent_executions");
            break;
        }
        if issue.labels.iter().any(|l| is_trigger_label(l)) && !issue.labels.iter().any(|l| is_handled_label(l)) {
            let issue_id = issue.number.to_string();
            scheduler::classify_and_act(ctx, &repo, &issue_id).await?;
        }
    }
    Ok(())
}

/// Phase 3: executions past `execution_timeout_seconds` are marked failed
/// and a best-effort cancel is sent to the compute backend; the run
/// itself is not forcibly killed.
async fn timeout_sweep<C: Clock>(ctx: &AppContext<C>) -> Result<(), EngineError> {
    let now = chrono::Utc::now();
    let timed_out = ctx.store.get_timed_out_executions(now, ctx.config.execution_timeout_seconds).await?;
    for mut execution in timed_out {
        tracing::info!(execution_id = %execution.id, issue_id = execution.issue_id, "execution timed out");
        if let Some(run_id) = execution.external_run_id.clone() {
            if let Err(err) = ctx.compute.cancel(&run_id).await {
                tracing::warn!(execution_id = %execution.id, error = %err, "best-effort cancel of timed-out run failed");
            }
        }
        execution.status = oj_core::ExecutionStatus::Failed;
        execution.result = Some("Timed out".to_string());
        execution.completed_at = Some(now);
        ctx.store.update_execution(&execution).await?;
    }
    Ok(())
}

async fn cron_cursor(ctx: &AppContext<impl Clock>, key: &str) -> Result<chrono::DateTime<chrono::Utc>, EngineError> {
    let value = ctx.store.get_cron_state(key).await?;
    Ok(value
        .and_then(|v| v.as_str().and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok()))
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|| chrono::DateTime::UNIX_EPOCH))
}

async fn advance_cron_cursor(ctx: &AppContext<impl Clock>, key: &str, value: chrono::DateTime<chrono::Utc>) -> Result<(), EngineError> {
    ctx.store.set_cron_state(key, serde_json::Value::String(value.to_rfc3339())).await?;
    Ok(())
}

/// Phase 4: new `CHANGES_REQUESTED`/`COMMENTED` reviews with a non-empty
/// body on open agent-branch PRs launch `address_review`; the cursor
/// advances past the newest review seen this cycle regardless of whether
/// every PR produced a launch.
async fn pr_review_sweep<C: Clock>(ctx: &AppContext<C>) -> Result<(), EngineError> {
    let Some(repo) = ctx.config.target_repo.clone() else { return Ok(()) };
    let since = cron_cursor(ctx, LAST_PR_CHECK).await?;
    let mut newest = since;

    let prs = ctx.tracker.list_agent_pull_requests(&repo).await?;
    for pr in prs.iter().filter(|pr| !pr.closed) {
        let Some(number) = agent_branch_issue_number(&pr.branch) else { continue };
        let reviews = ctx.tracker.list_reviews(&repo, pr.number).await?;
        for review in reviews {
            if review.submitted_at <= since || review.is_bot || review.body.trim().is_empty() {
                continue;
            }
            if !matches!(review.state, ReviewState::ChangesRequested | ReviewState::Commented) {
                continue;
            }
            newest = newest.max(review.submitted_at);
            let issue_id = number.to_string();
            scheduler::launch_address_review(ctx, &repo, &issue_id, number, pr.number, &review.body).await?;
        }
    }

    advance_cron_cursor(ctx, LAST_PR_CHECK, newest).await
}

/// Phase 5: closed-not-merged PRs with new human comments since the last
/// sweep trigger a retry, threading the latest comment in as feedback.
async fn closed_pr_sweep<C: Clock>(ctx: &AppContext<C>) -> Result<(), EngineError> {
    let Some(repo) = ctx.config.target_repo.clone() else { return Ok(()) };
    let since = cron_cursor(ctx, LAST_CLOSED_PR_CHECK).await?;
    let mut newest = since;

    let prs = ctx.tracker.list_agent_pull_requests(&repo).await?;
    for pr in prs.iter().filter(|pr| pr.closed && !pr.merged) {
        let Some(number) = agent_branch_issue_number(&pr.branch) else { continue };
        let comments = ctx.tracker.list_comments(&repo, number).await?;
        let fresh: Vec<_> = comments.into_iter().filter(|c| c.is_human() && c.created_at > since).collect();
        let Some(latest) = fresh.iter().map(|c| c.created_at).max() else { continue };
        newest = newest.max(latest);

        let issue_id = number.to_string();
        let feedback = fresh.last().map(|c| c.body.clone()).unwrap_or_default();
        scheduler::launch_retry(ctx, &repo, &issue_id, number, &feedback).await?;
    }

    advance_cron_cursor(ctx, LAST_CLOSED_PR_CHECK, newest).await
}

/// Phase 6: an `ag/blocked` issue whose last `type=blocked` comment is
/// followed by a human (non-bot, unmarked) reply gets an `implement`
/// launch with the reply threaded in as clarification.
async fn unblocked_sweep<C: Clock>(ctx: &AppContext<C>) -> Result<(), EngineError> {
    let Some(repo) = ctx.config.target_repo.clone() else { return Ok(()) };
    let blocked = ctx.tracker.list_issues(&repo, &["ag/blocked".to_string()]).await?;
    for issue in blocked {
        let comments = ctx.tracker.list_comments(&repo, issue.number).await?;
        let Some(marker_idx) = comments.iter().rposition(|c| c.is_blocked_marker()) else { continue };
        let Some(reply) = comments[marker_idx + 1..].iter().find(|c| c.is_human()) else { continue };
        let issue_id = issue.number.to_string();
        scheduler::launch_unblocked(ctx, &repo, &issue_id, &issue, &reply.body).await?;
    }
    Ok(())
}

/// Extracts issue numbers this issue declares itself blocked on, from
/// `Blocked by #N` / `Depends on #N` markers in the body — the planning
/// agent's sub-issue prompt contract (§4.6) asks it to write these when it
/// tags a sub-issue `ag/waiting`. Grounded on the same "parse references
/// out of free-form body text" approach §6 specifies for `Closes #N`
/// PR-to-issue correlation; no structured `blocked_by` field exists on
/// [`IssueDetails`] to read instead.
fn blocked_by(body: &str) -> Vec<i64> {
    let lower = body.to_ascii_lowercase();
    let mut out = Vec::new();
    for marker in ["blocked by", "depends on"] {
        let mut rest = lower.as_str();
        while let Some(idx) = rest.find(marker) {
            rest = &rest[idx + marker.len()..];
            let after_hash = rest.trim_start();
            if let Some(digits_start) = after_hash.strip_prefix('#') {
                let digits: String = digits_start.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(n) = digits.parse::<i64>() {
                    out.push(n);
                }
            }
        }
    }
    out
}

/// Phase 7: `ag/waiting` issues whose declared blockers have all closed
/// are released back to `ag/todo`; `ag/epic` parents whose sub-issues are
/// all terminal (closed or `ag/failed`) are closed with a summary
/// comment, success or failure depending on whether any sub failed.
async fn dependency_sweep<C: Clock>(ctx: &AppContext<C>) -> Result<(), EngineError> {
    let Some(repo) = ctx.config.target_repo.clone() else { return Ok(()) };
    release_unblocked_waiting_issues(ctx, &repo).await?;
    close_fulfilled_epics(ctx, &repo).await
}

async fn release_unblocked_waiting_issues<C: Clock>(ctx: &AppContext<C>, repo: &str) -> Result<(), EngineError> {
    let waiting = ctx.tracker.list_issues(repo, &["ag/waiting".to_string()]).await?;
    for issue in waiting {
        let blockers = blocked_by(&issue.body);
        if blockers.is_empty() {
            continue;
        }
        let mut all_closed = true;
        for blocker in &blockers {
            let blocker_issue = ctx.tracker.get_issue(repo, *blocker).await?;
            if !blocker_issue.closed {
                all_closed = false;
                break;
            }
        }
        if all_closed {
            ctx.tracker.set_label(repo, issue.number, "ag/todo").await?;
            tracing::info!(repo, issue_number = issue.number, "dependencies resolved, released to ag/todo");
        }
    }
    Ok(())
}

async fn close_fulfilled_epics<C: Clock>(ctx: &AppContext<C>, repo: &str) -> Result<(), EngineError> {
    let epics = ctx.tracker.list_issues(repo, &["ag/epic".to_string()]).await?;
    for epic in epics {
        let subs = ctx.tracker.list_subissues(repo, epic.number).await?;
        if subs.is_empty() || !subs.iter().all(is_terminal_sub_issue) {
            continue;
        }
        let any_failed = subs.iter().any(|s| s.labels.iter().any(|l| l == "ag/failed"));
        let summary = if any_failed {
            "All sub-issues have reached a terminal state, but at least one failed. Closing this epic; see sub-issues for detail.".to_string()
        } else {
            "All sub-issues are closed. Closing this epic.".to_string()
        };
        ctx.tracker.post_comment(repo, epic.number, &summary).await?;
        ctx.tracker.update_issue_status(repo, epic.number, true).await?;
        ctx.store
            .upsert_issue_state(
                epic.number,
                repo,
                &IssueStatePatch::default().last_checked_now(chrono::Utc::now()),
            )
            .await?;
        tracing::info!(repo, issue_number = epic.number, any_failed, "epic closed: all sub-issues terminal");
    }
    Ok(())
}

fn is_terminal_sub_issue(issue: &IssueDetails) -> bool {
    issue.closed || issue.labels.iter().any(|l| l == "ag/failed")
}

#[cfg(test)]
#[path = "control_loop_tests.rs"]
mod tests;
