// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical events flowing from the webhook deduplicator and the agent
//! compute backend onto the event bus, into the scheduler.

mod dispatch;

pub use dispatch::EventKind;

use serde::{Deserialize, Serialize};

use crate::execution::ExecutionId;

/// A canonical, coalesced fact dispatched on the event bus.
///
/// `Custom` is a forward-compatible catch-all: an event type this build
/// doesn't know about deserializes here instead of failing, so a rolling
/// deploy never drops a wire-compatible payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    IssueCreated {
        issue_id: String,
        repo: String,
        labels: Vec<String>,
    },
    IssueUpdated {
        issue_id: String,
        repo: String,
        action: String,
        labels: Vec<String>,
    },
    NudgeRequested {
        nudge_id: String,
        issue_id: String,
        #[serde(default)]
        repo: Option<String>,
        #[serde(default)]
        source_execution_id: Option<ExecutionId>,
        #[serde(default)]
        priority: i32,
        #[serde(default)]
        reason: Option<String>,
    },
    PrReview {
        repo: String,
        #[serde(default)]
        issue_id: Option<String>,
        pr_number: i64,
        branch: String,
        state: PrReviewState,
        #[serde(default)]
        body: String,
    },
    PrClosed {
        repo: String,
        #[serde(default)]
        issue_id: Option<String>,
        pr_number: i64,
        branch: String,
        merged: bool,
    },
    CheckRunFailed {
        repo: String,
        branch: String,
        #[serde(default)]
        pr_number: Option<i64>,
        head_sha: String,
        check_name: String,
        #[serde(default)]
        check_output: String,
        #[serde(default)]
        check_url: String,
    },
    AgentStarted {
        execution_id: ExecutionId,
        issue_id: String,
    },
    AgentCompleted {
        execution_id: ExecutionId,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        checkpoint: Option<serde_json::Value>,
    },
    AgentFailed {
        execution_id: ExecutionId,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(other)]
    Custom,
}

/// Review state on an open agent PR, carried by [`Event::PrReview`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrReviewState {
    ChangesRequested,
    Commented,
    Approved,
}

/// The deduplicator's verdict after analyzing a coalesced run of webhook
/// events for one `(repo, issue_id)`.
#[derive(Debug, Clone)]
pub enum ProcessingDecision {
    Drop { reason: String },
    Emit { event: Event, reason: String },
}

impl ProcessingDecision {
    pub fn drop(reason: impl Into<String>) -> Self {
        Self::Drop { reason: reason.into() }
    }

    pub fn emit(event: Event, reason: impl Into<String>) -> Self {
        Self::Emit { event, reason: reason.into() }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Drop { reason } | Self::Emit { reason, .. } => reason,
        }
    }

    pub fn should_trigger(&self) -> bool {
        matches!(self, Self::Emit { .. })
    }
}
