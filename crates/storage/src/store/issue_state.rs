// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived per-issue state, upserted with JSON-merge semantics.

use chrono::Utc;
use oj_core::{ClassificationCategory, IssueState, IssueStatePatch};
use sqlx::Row;

use crate::error::StoreResult;

use super::Store;

fn row_to_issue_state(row: sqlx::postgres::PgRow) -> StoreResult<IssueState> {
    let classification: Option<String> = row.try_get("classification")?;
    Ok(IssueState {
        issue_number: row.try_get("issue_number")?,
        repo: row.try_get("repo")?,
        classification: classification.and_then(|c| ClassificationCategory::parse(&c)),
        retry_count: row.try_get("retry_count")?,
        metadata: row.try_get("metadata")?,
        last_checked_at: row.try_get("last_checked_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Store {
    /// Merge semantics (grounded on `database.py`'s `ON CONFLICT DO
    /// UPDATE`): `classification`, `metadata` (JSON-merged via `||`, not
    /// replaced), and `last_checked_at` `COALESCE` with the prior value
    /// when the patch leaves them `None`. `retry_count` is the one
    /// exception — written verbatim when present, since callers compute
    /// the new value themselves before calling this.
    pub async fn upsert_issue_state(&self, issue_number: i64, repo: &str, patch: &IssueStatePatch) -> StoreResult<()> {
        let now = Utc::now();
        let classification = patch.classification.map(|c| c.to_string());
        let metadata_merge = patch.metadata_merge.clone().unwrap_or_else(|| serde_json::json!({}));

        sqlx::query(
            "INSERT INTO issue_state (issue_number, repo, classification, retry_count, metadata, last_checked_at, updated_at) \
             VALUES ($1, $2, $3, COALESCE($4, 0), $5, $6, $7) \
             ON CONFLICT (issue_number, repo) DO UPDATE SET \
                 classification = COALESCE(EXCLUDED.classification, issue_state.classification), \
                 retry_count = COALESCE($4, issue_state.retry_count), \
                 metadata = issue_state.metadata || EXCLUDED.metadata, \
                 last_checked_at = COALESCE($6, issue_state.last_checked_at), \
                 updated_at = $7",
        )
        .bind(issue_number)
        .bind(repo)
        .bind(&classification)
        .bind(patch.retry_count)
        .bind(&metadata_merge)
        .bind(patch.last_checked_at)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_issue_state(&self, issue_number: i64, repo: &str) -> StoreResult<Option<IssueState>> {
        let row = sqlx::query("SELECT * FROM issue_state WHERE issue_number = $1 AND repo = $2")
            .bind(issue_number)
            .bind(repo)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_issue_state).transpose()
    }

    pub async fn list_issue_states(&self, repo: &str, classification: Option<ClassificationCategory>) -> StoreResult<Vec<IssueState>> {
        let rows = sqlx::query(
            "SELECT * FROM issue_state WHERE repo = $1 AND ($2::text IS NULL OR classification = $2) \
             ORDER BY updated_at DESC",
        )
        .bind(repo)
        .bind(classification.map(|c| c.to_string()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_issue_state).collect()
    }
}

#[cfg(test)]
#[path = "issue_state_tests.rs"]
mod tests;
