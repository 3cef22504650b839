// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single agent attempt on a single issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an execution.
    pub struct ExecutionId("exe-");
}

/// Lifecycle status of an execution.
///
/// Invariant I1: for a given `issue_id`, at most one execution may be in
/// `Pending` or `Running` at a time. Enforced by the store's partial
/// unique index, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

crate::simple_display! {
    ExecutionStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

impl ExecutionStatus {
    /// Whether an execution in this status counts against the
    /// at-most-one-active invariant.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// The flavor of work an agent is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Implement,
    Plan,
    AddressReview,
    RetryWithFeedback,
    FixCi,
}

crate::simple_display! {
    ExecutionMode {
        Implement => "implement",
        Plan => "plan",
        AddressReview => "address_review",
        RetryWithFeedback => "retry_with_feedback",
        FixCi => "fix_ci",
    }
}

impl ExecutionMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "implement" => Some(Self::Implement),
            "plan" => Some(Self::Plan),
            "address_review" => Some(Self::AddressReview),
            "retry_with_feedback" => Some(Self::RetryWithFeedback),
            "fix_ci" => Some(Self::FixCi),
            _ => None,
        }
    }
}

/// One attempt by one agent on one issue in one mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub issue_id: String,
    pub repo_url: String,
    pub status: ExecutionStatus,
    pub mode: ExecutionMode,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<i64>,
    /// Opaque handle used to poll the compute backend; restart-safe recovery
    /// rehydrates the poller's working set from this column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_run_id: Option<String>,
    /// Opaque JSON handed back to the next execution on the same issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Execution {
    /// Construct a fresh pending execution ready to be claimed.
    pub fn new(issue_id: impl Into<String>, repo_url: impl Into<String>, mode: ExecutionMode, prompt: impl Into<String>) -> Self {
        Self {
            id: ExecutionId::new(),
            issue_id: issue_id.into(),
            repo_url: repo_url.into(),
            status: ExecutionStatus::Pending,
            mode,
            prompt: prompt.into(),
            result: None,
            branch: None,
            pr_number: None,
            external_run_id: None,
            checkpoint: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn elapsed_since_started(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let reference = self.started_at.or(Some(self.created_at))?;
        Some(now - reference)
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct ExecutionBuilder => Execution {
        into {
            issue_id: String = "42",
            repo_url: String = "https://github.com/acme/widgets.git",
            prompt: String = "implement the thing",
        }
        set {
            mode: ExecutionMode = ExecutionMode::Implement,
            status: ExecutionStatus = ExecutionStatus::Pending,
        }
        option {
            result: String = None,
            branch: String = None,
            external_run_id: String = None,
        }
        computed {
            id: ExecutionId = ExecutionId::new(),
            pr_number: Option<i64> = None,
            checkpoint: Option<serde_json::Value> = None,
            created_at: DateTime<Utc> = Utc::now(),
            started_at: Option<DateTime<Utc>> = None,
            completed_at: Option<DateTime<Utc>> = None,
        }
    }
}
