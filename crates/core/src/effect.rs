// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects: the outward-facing actions a scheduler or control-loop handler
//! decides to take. Kept as data rather than performed inline so that
//! `dry_run` deployments can log intent instead of executing it, and so
//! tests can assert on "what would have happened" without a live tracker
//! or compute backend.

use crate::execution::{ExecutionId, ExecutionMode};
use crate::issue_state::IssueStatePatch;
use crate::nudge::NudgeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Launch an agent via the shared launch subroutine. `context` is
    /// free-form text threaded into the prompt (e.g. a human's clarifying
    /// reply in launch-unblocked, or review-comment bodies in
    /// launch-address-review); the launch subroutine also consults the
    /// issue's latest checkpoint on its own, so callers don't repeat it here.
    LaunchAgent {
        issue_id: String,
        repo: String,
        mode: ExecutionMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        issue_number: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    /// Remove all other `ag/*` labels, then add this one.
    TransitionLabel { repo: String, issue_id: String, label: String },
    /// Post a comment on the issue.
    PostComment { repo: String, issue_id: String, body: String },
    /// Close the tracker issue.
    CloseIssue { repo: String, issue_id: String },
    /// Persist classification on the issue's derived state.
    RecordClassification { issue_number: i64, repo: String, category: String },
    /// Mark an execution completed or failed, with an optional checkpoint.
    FinalizeExecution {
        execution_id: ExecutionId,
        succeeded: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checkpoint: Option<serde_json::Value>,
    },
    /// Merge-upsert arbitrary fields onto an issue's derived state (retry
    /// counters, CI-fix bookkeeping, blocked-question metadata).
    UpsertIssueState { issue_number: i64, repo: String, patch: IssueStatePatch },
    /// Mark a queued nudge as consumed so it isn't offered again.
    MarkNudgeProcessed { nudge_id: NudgeId },
    /// Advance a named cron cursor to a new opaque value.
    AdvanceCursor { key: String, value: serde_json::Value },
    /// Best-effort ask the compute backend to stop a run; the execution
    /// record is finalized separately regardless of this effect's outcome.
    CancelRun { external_run_id: String },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::LaunchAgent { .. } => "launch_agent",
            Effect::TransitionLabel { .. } => "transition_label",
            Effect::PostComment { .. } => "post_comment",
            Effect::CloseIssue { .. } => "close_issue",
            Effect::RecordClassification { .. } => "record_classification",
            Effect::FinalizeExecution { .. } => "finalize_execution",
            Effect::UpsertIssueState { .. } => "upsert_issue_state",
            Effect::MarkNudgeProcessed { .. } => "mark_nudge_processed",
            Effect::AdvanceCursor { .. } => "advance_cursor",
            Effect::CancelRun { .. } => "cancel_run",
        }
    }

    /// Structured fields for `tracing`, in a stable order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::LaunchAgent { issue_id, repo, mode, .. } => {
                vec![("issue_id", issue_id.clone()), ("repo", repo.clone()), ("mode", mode.to_string())]
            }
            Effect::UpsertIssueState { issue_number, repo, .. } => {
                vec![("issue_number", issue_number.to_string()), ("repo", repo.clone())]
            }
            Effect::MarkNudgeProcessed { nudge_id } => vec![("nudge_id", nudge_id.to_string())],
            Effect::CancelRun { external_run_id } => vec![("external_run_id", external_run_id.clone())],
            Effect::TransitionLabel { repo, issue_id, label } => {
                vec![("repo", repo.clone()), ("issue_id", issue_id.clone()), ("label", label.clone())]
            }
            Effect::PostComment { repo, issue_id, .. } => {
                vec![("repo", repo.clone()), ("issue_id", issue_id.clone())]
            }
            Effect::CloseIssue { repo, issue_id } => {
                vec![("repo", repo.clone()), ("issue_id", issue_id.clone())]
            }
            Effect::RecordClassification { issue_number, repo, category } => vec![
                ("issue_number", issue_number.to_string()),
                ("repo", repo.clone()),
                ("category", category.clone()),
            ],
            Effect::FinalizeExecution { execution_id, succeeded, .. } => {
                vec![("execution_id", execution_id.to_string()), ("succeeded", succeeded.to_string())]
            }
            Effect::AdvanceCursor { key, .. } => vec![("key", key.clone())],
        }
    }

    /// Whether this effect should only be logged at `debug` rather than
    /// `info` — high-frequency, low-interest bookkeeping.
    pub fn verbose(&self) -> bool {
        matches!(self, Effect::AdvanceCursor { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_stable_per_variant() {
        let effect = Effect::LaunchAgent {
            issue_id: "7".into(),
            repo: "acme/widgets".into(),
            mode: ExecutionMode::Implement,
            issue_number: Some(7),
            context: None,
        };
        assert_eq!(effect.name(), "launch_agent");
        assert!(effect.fields().iter().any(|(k, _)| *k == "mode"));
    }

    #[test]
    fn advance_cursor_is_verbose() {
        let effect = Effect::AdvanceCursor { key: "last_pr_check".into(), value: serde_json::json!(null) };
        assert!(effect.verbose());
    }
}
