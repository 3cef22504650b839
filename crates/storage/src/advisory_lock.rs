// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process mutual exclusion for the standalone control-loop job.
//!
//! The in-process daemon task never takes this lock — `try_claim_issue`'s
//! partial unique index is the only mutual exclusion the scheduler needs.
//! This lock exists solely so that two concurrent invocations of the
//! control loop as a standalone cron job (as opposed to an in-process
//! daemon task) cannot overlap.

use sqlx::PgPool;

use crate::error::StoreResult;

/// `pg_try_advisory_lock` key: a fixed constant derived from the crate
/// name, stable across releases so every deployed version contends for
/// the same lock.
const CONTROL_LOOP_LOCK_KEY: i64 = const_fnv1a_hash(b"agent-grid.control-loop") as i64;

const fn const_fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x100000001b3);
        i += 1;
    }
    hash
}

/// Held while `true`; releases the advisory lock on drop via `release`.
pub struct ControlLoopLockGuard {
    pool: PgPool,
    held: bool,
}

impl ControlLoopLockGuard {
    pub async fn release(mut self) -> StoreResult<()> {
        if self.held {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(CONTROL_LOOP_LOCK_KEY)
                .execute(&self.pool)
                .await?;
            self.held = false;
        }
        Ok(())
    }
}

/// Attempt to take the process-wide control-loop advisory lock.
/// Returns `None` if another process already holds it.
pub async fn try_acquire_control_loop_lock(pool: &PgPool) -> StoreResult<Option<ControlLoopLockGuard>> {
    let (acquired,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .bind(CONTROL_LOOP_LOCK_KEY)
        .fetch_one(pool)
        .await?;

    if acquired {
        Ok(Some(ControlLoopLockGuard { pool: pool.clone(), held: true }))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_stable() {
        assert_eq!(CONTROL_LOOP_LOCK_KEY, const_fnv1a_hash(b"agent-grid.control-loop") as i64);
    }
}
