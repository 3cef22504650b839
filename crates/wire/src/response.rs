// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses the daemon sends back over the local socket.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSummary {
    pub running_executions: usize,
    pub pending_nudges: usize,
    pub dry_run: bool,
    pub deployment_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionSummary {
    pub id: String,
    pub issue_id: String,
    pub repo_url: String,
    pub status: String,
    pub mode: String,
    pub external_run_id: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueStateSummary {
    pub issue_number: i64,
    pub repo: String,
    pub classification: Option<String>,
    pub retry_count: i32,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NudgeSummary {
    pub id: String,
    pub issue_id: String,
    pub priority: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BudgetStatusSummary {
    pub tokens_used: i64,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    Status(StatusSummary),
    Executions(Vec<ExecutionSummary>),
    Execution(Option<ExecutionSummary>),
    IssueStates(Vec<IssueStateSummary>),
    NudgeQueued(NudgeSummary),
    Budget(BudgetStatusSummary),
    Ack,
    Error { message: String },
}
