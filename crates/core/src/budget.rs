// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-execution resource accounting, summed for the budget manager's
//! `get_budget_status()`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::execution::ExecutionId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetUsageRecord {
    pub execution_id: ExecutionId,
    pub tokens_used: i64,
    pub duration_seconds: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate usage across every recorded execution, as returned by
/// `Store::get_total_budget_usage`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TotalBudgetUsage {
    pub tokens_used: i64,
    pub duration_seconds: i64,
}
