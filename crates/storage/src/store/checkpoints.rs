// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-issue checkpoint history, handed from one execution to the next.

use oj_core::{Checkpoint, ExecutionId};
use sqlx::Row;

use crate::error::StoreResult;

use super::Store;

fn row_to_checkpoint(row: sqlx::postgres::PgRow) -> StoreResult<Checkpoint> {
    Ok(Checkpoint {
        issue_id: row.try_get("issue_id")?,
        execution_id: ExecutionId::from_string(row.try_get::<String, _>("execution_id")?),
        data: row.try_get("data")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Store {
    pub async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> StoreResult<()> {
        sqlx::query("INSERT INTO checkpoints (issue_id, execution_id, data, created_at) VALUES ($1, $2, $3, $4)")
            .bind(&checkpoint.issue_id)
            .bind(checkpoint.execution_id.as_str())
            .bind(&checkpoint.data)
            .bind(checkpoint.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_latest_checkpoint(&self, issue_id: &str) -> StoreResult<Option<Checkpoint>> {
        let row = sqlx::query("SELECT * FROM checkpoints WHERE issue_id = $1 ORDER BY created_at DESC LIMIT 1")
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_checkpoint).transpose()
    }

    /// Newest-first, per §3's "handed from one execution to the next" —
    /// a caller wanting full history reads this, not just the latest.
    pub async fn get_all_checkpoints(&self, issue_id: &str) -> StoreResult<Vec<Checkpoint>> {
        let rows = sqlx::query("SELECT * FROM checkpoints WHERE issue_id = $1 ORDER BY created_at DESC")
            .bind(issue_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_checkpoint).collect()
    }
}

#[cfg(test)]
#[path = "checkpoints_tests.rs"]
mod tests;
