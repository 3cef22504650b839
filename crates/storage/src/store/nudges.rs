// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queued external requests to start work on a specific issue.

use oj_core::{ExecutionId, NudgeId, NudgeRequest};
use sqlx::Row;

use crate::error::StoreResult;

use super::Store;

fn row_to_nudge(row: sqlx::postgres::PgRow) -> StoreResult<NudgeRequest> {
    let source_execution_id: Option<String> = row.try_get("source_execution_id")?;
    Ok(NudgeRequest {
        id: NudgeId::from_string(row.try_get::<String, _>("id")?),
        issue_id: row.try_get("issue_id")?,
        source_execution_id: source_execution_id.map(ExecutionId::from_string),
        priority: row.try_get("priority")?,
        reason: row.try_get("reason")?,
        created_at: row.try_get("created_at")?,
        processed_at: row.try_get("processed_at")?,
    })
}

impl Store {
    pub async fn create_nudge(&self, nudge: &NudgeRequest) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO nudge_queue (id, issue_id, source_execution_id, priority, reason, created_at, processed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(nudge.id.as_str())
        .bind(&nudge.issue_id)
        .bind(nudge.source_execution_id.as_ref().map(|id| id.as_str().to_string()))
        .bind(nudge.priority)
        .bind(&nudge.reason)
        .bind(nudge.created_at)
        .bind(nudge.processed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Pending nudges ordered `(priority DESC, created_at ASC)`.
    pub async fn get_pending_nudges(&self, limit: i64) -> StoreResult<Vec<NudgeRequest>> {
        let rows = sqlx::query(
            "SELECT * FROM nudge_queue WHERE processed_at IS NULL \
             ORDER BY priority DESC, created_at ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_nudge).collect()
    }

    pub async fn mark_nudge_processed(&self, id: NudgeId) -> StoreResult<()> {
        sqlx::query("UPDATE nudge_queue SET processed_at = now() WHERE id = $1").bind(id.as_str()).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "nudges_tests.rs"]
mod tests;
