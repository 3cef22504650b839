// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::event::PrReviewState;
use crate::{Event, ExecutionId};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::{ClassificationCategory, ExecutionStatus};
    use proptest::prelude::*;

    pub fn arb_execution_status() -> impl Strategy<Value = ExecutionStatus> {
        prop_oneof![
            Just(ExecutionStatus::Pending),
            Just(ExecutionStatus::Running),
            Just(ExecutionStatus::Completed),
            Just(ExecutionStatus::Failed),
        ]
    }

    pub fn arb_classification_category() -> impl Strategy<Value = ClassificationCategory> {
        prop_oneof![
            Just(ClassificationCategory::Simple),
            Just(ClassificationCategory::Complex),
            Just(ClassificationCategory::Blocked),
            Just(ClassificationCategory::Skip),
        ]
    }
}

// ── Event factory functions ─────────────────────────────────────────────

pub fn issue_created_event(issue_id: &str, repo: &str) -> Event {
    Event::IssueCreated { issue_id: issue_id.to_string(), repo: repo.to_string(), labels: vec!["ag/todo".to_string()] }
}

pub fn issue_updated_event(issue_id: &str, repo: &str, action: &str) -> Event {
    Event::IssueUpdated {
        issue_id: issue_id.to_string(),
        repo: repo.to_string(),
        action: action.to_string(),
        labels: vec!["ag/todo".to_string()],
    }
}

pub fn nudge_requested_event(nudge_id: &str, issue_id: &str) -> Event {
    Event::NudgeRequested {
        nudge_id: nudge_id.to_string(),
        issue_id: issue_id.to_string(),
        repo: None,
        source_execution_id: None,
        priority: 0,
        reason: None,
    }
}

pub fn pr_review_event(repo: &str, pr_number: i64, branch: &str, state: PrReviewState) -> Event {
    Event::PrReview { repo: repo.to_string(), issue_id: None, pr_number, branch: branch.to_string(), state, body: String::new() }
}

pub fn pr_closed_event(repo: &str, pr_number: i64, branch: &str, merged: bool) -> Event {
    Event::PrClosed { repo: repo.to_string(), issue_id: None, pr_number, branch: branch.to_string(), merged }
}

pub fn check_run_failed_event(repo: &str, branch: &str, head_sha: &str) -> Event {
    Event::CheckRunFailed {
        repo: repo.to_string(),
        branch: branch.to_string(),
        pr_number: None,
        head_sha: head_sha.to_string(),
        check_name: "ci".to_string(),
        check_output: String::new(),
        check_url: String::new(),
    }
}

pub fn agent_started_event(execution_id: ExecutionId, issue_id: &str) -> Event {
    Event::AgentStarted { execution_id, issue_id: issue_id.to_string() }
}

pub fn agent_completed_event(execution_id: ExecutionId) -> Event {
    Event::AgentCompleted { execution_id, result: None, checkpoint: None }
}

pub fn agent_failed_event(execution_id: ExecutionId, error: &str) -> Event {
    Event::AgentFailed { execution_id, error: Some(error.to_string()) }
}
