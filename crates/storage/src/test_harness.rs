// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test harness for store tests.
//!
//! The pack has no embedded-Postgres precedent, so these tests run only
//! when `DATABASE_URL_TEST` points at a real (disposable) database —
//! otherwise they skip rather than fail the suite. Run them explicitly
//! with `serial_test::serial` under a live database, one schema per test
//! run via `CREATE SCHEMA ... ; SET search_path`.

use sqlx::PgPool;

use crate::pool;
use crate::store::Store;

/// Returns `None` when `DATABASE_URL_TEST` isn't set, so callers can early
/// return and skip instead of failing in environments without Postgres.
pub async fn test_store() -> Option<Store> {
    let url = std::env::var("DATABASE_URL_TEST").ok()?;
    let pool = pool::connect(&url).await.expect("connect to test database");
    reset_schema(&pool).await;
    pool::migrate(&pool).await.expect("run migrations");
    Some(Store::new(pool))
}

async fn reset_schema(pool: &PgPool) {
    for table in [
        "checkpoints",
        "budget_usage",
        "webhook_events",
        "nudge_queue",
        "issue_state",
        "executions",
        "cron_state",
    ] {
        let _ = sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE")).execute(pool).await;
    }
    let _ = sqlx::query("DELETE FROM _sqlx_migrations").execute(pool).await;
}
