// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Durable Store: every table the coordinator persists to, behind a
//! single `Store` handle threaded through the daemon's `AppContext`.
//!
//! Each public method is a single atomic round-trip unless its doc comment
//! says otherwise. `Store` is cheap to clone (`PgPool` is itself an `Arc`
//! around a connection pool).

mod budget;
mod checkpoints;
mod cron;
mod executions;
mod issue_state;
mod nudges;
mod webhooks;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

use sqlx::PgPool;

pub use executions::ExecutionFilter;

/// Handle to the relational backend. Construct via [`crate::pool::connect`]
/// + [`crate::pool::migrate`], then wrap in `Store::new`.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
