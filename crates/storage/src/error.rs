// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error taxonomy.
//!
//! Failure mode is blanket per spec §4.1: any non-connectivity error
//! surfaces as [`StoreError::Query`]; connectivity failures are retried
//! with bounded backoff inside [`crate::pool::connect`] before a caller
//! ever sees them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Backstop path for invariant I1: a unique-violation on
    /// `executions_issue_active_uidx` is treated identically to a lost
    /// `try_claim_issue` race, not as a fatal error.
    #[error("claim lost: another execution is already active for this issue")]
    ClaimLost,
}

impl StoreError {
    /// True when this is the unique-constraint race on the partial index
    /// backing invariant I1, rather than a genuine failure.
    pub fn is_claim_lost(&self) -> bool {
        match self {
            StoreError::ClaimLost => true,
            StoreError::Query(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
