// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests the admin CLI can send over the local socket.

use serde::{Deserialize, Serialize};

/// Optional filter for [`Request::ListExecutions`]; `None` fields are
/// unconstrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionListFilter {
    pub issue_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Daemon health, running-execution count, and pending-nudge count.
    Status,
    ListExecutions { filter: ExecutionListFilter },
    GetExecution { execution_id: String },
    ListIssueStates { repo: String, classification: Option<String> },
    /// Queue a nudge for `issue_id`; mirrors what a webhook-driven nudge
    /// comment produces, for operators who want to trigger one by hand.
    TriggerNudge { issue_id: String, reason: Option<String> },
    /// Best-effort: asks the compute backend to cancel the run and marks
    /// the execution failed. Not a redo of the claim/launch logic.
    CancelExecution { execution_id: String },
    /// Runs every control-loop phase once, out of band from its normal
    /// interval — for operators who don't want to wait out the next tick.
    RunControlLoopOnce,
    /// Total recorded token/duration usage across every execution.
    BudgetStatus,
    /// Asks the daemon to stop its background tasks and exit cleanly.
    Shutdown,
}
