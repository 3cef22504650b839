// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event dispatch helpers — kind tagging, structured log summaries.

use super::Event;

/// Coarse-grained tag used by `EventBus::subscribe` to filter handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    IssueCreated,
    IssueUpdated,
    NudgeRequested,
    PrReview,
    PrClosed,
    CheckRunFailed,
    AgentStarted,
    AgentCompleted,
    AgentFailed,
    Custom,
}

crate::simple_display! {
    EventKind {
        IssueCreated => "issue_created",
        IssueUpdated => "issue_updated",
        NudgeRequested => "nudge_requested",
        PrReview => "pr_review",
        PrClosed => "pr_closed",
        CheckRunFailed => "check_run_failed",
        AgentStarted => "agent_started",
        AgentCompleted => "agent_completed",
        AgentFailed => "agent_failed",
        Custom => "custom",
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::IssueCreated { .. } => EventKind::IssueCreated,
            Event::IssueUpdated { .. } => EventKind::IssueUpdated,
            Event::NudgeRequested { .. } => EventKind::NudgeRequested,
            Event::PrReview { .. } => EventKind::PrReview,
            Event::PrClosed { .. } => EventKind::PrClosed,
            Event::CheckRunFailed { .. } => EventKind::CheckRunFailed,
            Event::AgentStarted { .. } => EventKind::AgentStarted,
            Event::AgentCompleted { .. } => EventKind::AgentCompleted,
            Event::AgentFailed { .. } => EventKind::AgentFailed,
            Event::Custom => EventKind::Custom,
        }
    }

    /// `(repo, issue_id)` this event concerns, when it concerns one issue.
    /// Used by the deduplicator's coalescing key and by structured logging.
    pub fn issue_key(&self) -> Option<(&str, &str)> {
        match self {
            Event::IssueCreated { repo, issue_id, .. } => Some((repo, issue_id)),
            Event::IssueUpdated { repo, issue_id, .. } => Some((repo, issue_id)),
            Event::PrReview { repo, issue_id: Some(id), .. } => Some((repo, id)),
            Event::PrClosed { repo, issue_id: Some(id), .. } => Some((repo, id)),
            _ => None,
        }
    }

    pub fn log_summary(&self) -> String {
        match self.issue_key() {
            Some((repo, issue_id)) => format!("{} {}#{}", self.kind(), repo, issue_id),
            None => self.kind().to_string(),
        }
    }
}
