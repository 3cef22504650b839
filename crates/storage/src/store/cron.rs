// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key/value bookkeeping for the periodic control loop (last-run
//! timestamps, cursor positions) — survives daemon restarts.

use sqlx::Row;

use crate::error::StoreResult;

use super::Store;

impl Store {
    pub async fn get_cron_state(&self, key: &str) -> StoreResult<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT value FROM cron_state WHERE key = $1").bind(key).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    pub async fn set_cron_state(&self, key: &str, value: serde_json::Value) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO cron_state (key, value, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(&value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
