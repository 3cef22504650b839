// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executions: the at-most-one-active-per-issue primitive (invariant I1).

use chrono::{DateTime, Utc};
use oj_core::{Execution, ExecutionId, ExecutionMode, ExecutionStatus};
use sqlx::Row;

use crate::error::{StoreError, StoreResult};

use super::Store;

/// Filter set for [`Store::list_executions`]. All fields are conjunctive;
/// `None` means "don't filter on this field".
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub issue_id: Option<String>,
    pub repo_url: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub mode: Option<ExecutionMode>,
}

fn row_to_execution(row: sqlx::postgres::PgRow) -> StoreResult<Execution> {
    let status_raw: String = row.try_get("status")?;
    let mode_raw: String = row.try_get("mode")?;
    Ok(Execution {
        id: ExecutionId::from_string(row.try_get::<String, _>("id")?),
        issue_id: row.try_get("issue_id")?,
        repo_url: row.try_get("repo_url")?,
        status: ExecutionStatus::parse(&status_raw).unwrap_or(ExecutionStatus::Failed),
        mode: ExecutionMode::parse(&mode_raw).unwrap_or(ExecutionMode::Implement),
        prompt: row.try_get("prompt")?,
        result: row.try_get("result")?,
        branch: row.try_get("branch")?,
        pr_number: row.try_get("pr_number")?,
        external_run_id: row.try_get("external_run_id")?,
        checkpoint: row.try_get("checkpoint")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

impl Store {
    /// Insert a fresh execution row. Does not enforce I1 — callers that
    /// need the at-most-one-active guarantee must go through
    /// [`Store::try_claim_issue`] instead.
    pub async fn create_execution(&self, exec: &Execution) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO executions (id, issue_id, repo_url, status, mode, prompt, result, \
             branch, pr_number, external_run_id, checkpoint, created_at, started_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(exec.id.as_str())
        .bind(&exec.issue_id)
        .bind(&exec.repo_url)
        .bind(exec.status.to_string())
        .bind(exec.mode.to_string())
        .bind(&exec.prompt)
        .bind(&exec.result)
        .bind(&exec.branch)
        .bind(exec.pr_number)
        .bind(&exec.external_run_id)
        .bind(&exec.checkpoint)
        .bind(exec.created_at)
        .bind(exec.started_at)
        .bind(exec.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `INSERT … WHERE NOT EXISTS` an active execution for `issue_id`.
    /// Returns whether this caller won the claim. The sole primitive
    /// enforcing invariant I1 — races with the partial unique index as a
    /// second line of defense, absorbed as `Ok(false)` rather than an
    /// error when lost.
    pub async fn try_claim_issue(&self, exec: &Execution) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO executions (id, issue_id, repo_url, status, mode, prompt, result, \
             branch, pr_number, external_run_id, checkpoint, created_at, started_at, completed_at) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM executions \
                 WHERE issue_id = $2 AND status IN ('pending', 'running') \
             )",
        )
        .bind(exec.id.as_str())
        .bind(&exec.issue_id)
        .bind(&exec.repo_url)
        .bind(exec.status.to_string())
        .bind(exec.mode.to_string())
        .bind(&exec.prompt)
        .bind(&exec.result)
        .bind(&exec.branch)
        .bind(exec.pr_number)
        .bind(&exec.external_run_id)
        .bind(&exec.checkpoint)
        .bind(exec.created_at)
        .bind(exec.started_at)
        .bind(exec.completed_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(outcome) => Ok(outcome.rows_affected() == 1),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(err) => Err(StoreError::from(err)),
        }
    }

    pub async fn update_execution(&self, exec: &Execution) -> StoreResult<()> {
        sqlx::query(
            "UPDATE executions SET status = $2, result = $3, branch = $4, pr_number = $5, \
             external_run_id = $6, checkpoint = $7, started_at = $8, completed_at = $9 \
             WHERE id = $1",
        )
        .bind(exec.id.as_str())
        .bind(exec.status.to_string())
        .bind(&exec.result)
        .bind(&exec.branch)
        .bind(exec.pr_number)
        .bind(&exec.external_run_id)
        .bind(&exec.checkpoint)
        .bind(exec.started_at)
        .bind(exec.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_execution(&self, id: ExecutionId) -> StoreResult<Option<Execution>> {
        let row = sqlx::query("SELECT * FROM executions WHERE id = $1").bind(id.as_str()).fetch_optional(&self.pool).await?;
        row.map(row_to_execution).transpose()
    }

    /// Most recent execution for an issue, across all statuses.
    pub async fn get_execution_for_issue(&self, issue_id: &str) -> StoreResult<Option<Execution>> {
        let row = sqlx::query("SELECT * FROM executions WHERE issue_id = $1 ORDER BY created_at DESC LIMIT 1")
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_execution).transpose()
    }

    pub async fn list_executions(&self, filter: &ExecutionFilter) -> StoreResult<Vec<Execution>> {
        // Every filter binds as `$n::text IS NULL OR col = $n` so the
        // parameter list stays fixed regardless of which filters are set.
        let rows = sqlx::query(
            "SELECT * FROM executions \
             WHERE ($1::text IS NULL OR issue_id = $1) \
               AND ($2::text IS NULL OR repo_url = $2) \
               AND ($3::text IS NULL OR status = $3) \
               AND ($4::text IS NULL OR mode = $4) \
             ORDER BY created_at DESC",
        )
        .bind(&filter.issue_id)
        .bind(&filter.repo_url)
        .bind(filter.status.map(|s| s.to_string()))
        .bind(filter.mode.map(|m| m.to_string()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_execution).collect()
    }

    pub async fn get_running_executions(&self) -> StoreResult<Vec<Execution>> {
        let rows = sqlx::query("SELECT * FROM executions WHERE status IN ('pending', 'running') ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_execution).collect()
    }

    pub async fn get_issue_id_for_execution(&self, execution_id: ExecutionId) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT issue_id FROM executions WHERE id = $1")
            .bind(execution_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(issue_id,)| issue_id))
    }

    pub async fn set_external_run_id(&self, execution_id: ExecutionId, handle: &str) -> StoreResult<()> {
        sqlx::query("UPDATE executions SET external_run_id = $2 WHERE id = $1")
            .bind(execution_id.as_str())
            .bind(handle)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Executions still pending/running with a recorded compute-backend
    /// handle — the restart-recovery working set (§5, Restart recovery).
    pub async fn get_active_executions_with_external_run_id(&self) -> StoreResult<Vec<Execution>> {
        let rows = sqlx::query(
            "SELECT * FROM executions \
             WHERE status IN ('pending', 'running') AND external_run_id IS NOT NULL \
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_execution).collect()
    }

    /// Timed-out executions per the periodic sweep (§4.5 phase 3):
    /// pending/running whose `started_at ?? created_at` is older than
    /// `timeout_seconds`.
    pub async fn get_timed_out_executions(&self, now: DateTime<Utc>, timeout_seconds: i64) -> StoreResult<Vec<Execution>> {
        let rows = sqlx::query(
            "SELECT * FROM executions \
             WHERE status IN ('pending', 'running') \
               AND EXTRACT(EPOCH FROM ($1::timestamptz - COALESCE(started_at, created_at))) > $2",
        )
        .bind(now)
        .bind(timeout_seconds as f64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_execution).collect()
    }
}
