// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool construction and migration enforcement.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};

/// Minimum and maximum pool size per the Concurrency & Resource Model
/// (§5): `min 2, max 10 connections`.
const MIN_CONNECTIONS: u32 = 2;
const MAX_CONNECTIONS: u32 = 10;

/// Bounded retry budget for transient connection failures at startup.
/// Query-time connectivity errors are not retried here — they surface to
/// the caller per the blanket failure-mode policy in §4.1.
const CONNECT_RETRIES: u32 = 5;
const CONNECT_BACKOFF_BASE: Duration = Duration::from_millis(200);

/// Build a pool and acquire one connection to prove connectivity, retrying
/// with bounded exponential backoff. Does not run migrations — call
/// [`migrate`] once the pool is built.
pub async fn connect(database_url: &str) -> StoreResult<PgPool> {
    let options: PgConnectOptions = database_url.parse().map_err(StoreError::Connection)?;

    let mut attempt = 0;
    loop {
        let result = PgPoolOptions::new()
            .min_connections(MIN_CONNECTIONS)
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => return Ok(pool),
            Err(err) if attempt + 1 < CONNECT_RETRIES => {
                attempt += 1;
                let backoff = CONNECT_BACKOFF_BASE * 2u32.pow(attempt - 1);
                tracing::warn!(attempt, error = %err, "store connect failed, retrying");
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(StoreError::Connection(err)),
        }
    }
}

/// Run embedded migrations. The store refuses to start against a database
/// whose applied migration set doesn't match the binary's embedded set —
/// `sqlx::migrate!` surfaces that mismatch as an error here rather than
/// serving traffic against a stale schema.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
