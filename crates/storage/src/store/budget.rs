// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-execution token/duration usage, and the running total (invariant I4).

use oj_core::{BudgetUsageRecord, ExecutionId, TotalBudgetUsage};
use sqlx::Row;

use crate::error::StoreResult;

use super::Store;

impl Store {
    pub async fn record_budget_usage(&self, record: &BudgetUsageRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO budget_usage (execution_id, tokens_used, duration_seconds, recorded_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(record.execution_id.as_str())
        .bind(record.tokens_used)
        .bind(record.duration_seconds)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sums every recorded row — the gate check (I4) compares this against
    /// the configured ceiling before allowing a new launch.
    pub async fn get_total_budget_usage(&self) -> StoreResult<TotalBudgetUsage> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(tokens_used), 0) AS tokens_used, \
                    COALESCE(SUM(duration_seconds), 0) AS duration_seconds \
             FROM budget_usage",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(TotalBudgetUsage {
            tokens_used: row.try_get("tokens_used")?,
            duration_seconds: row.try_get("duration_seconds")?,
        })
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
