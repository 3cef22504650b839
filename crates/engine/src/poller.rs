// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The compute-backend poller (§5's data flow: "Compute backend → result →
//! event bus → scheduler"). Polls every pending/running execution that
//! carries a recorded `external_run_id` and publishes the terminal event
//! once the backend reports one, the same way `launch.rs` publishes
//! `AGENT_STARTED` after a successful launch.
//!
//! Reads its working set fresh from the store on every tick rather than
//! keeping one in memory, so restart recovery (§5: "the backend rehydrates
//! its polling set from the store") falls out of the tick loop itself —
//! there is no separate startup step to run.

use std::time::Duration;

use oj_adapters::RunStatus;
use oj_core::{Clock, Event};

use crate::context::AppContext;

/// Poll every active execution once. A backend error on one run is logged
/// and skipped; it does not stop the rest of the batch.
pub async fn run_once<C: Clock>(ctx: &AppContext<C>) {
    let active = match ctx.store.get_active_executions_with_external_run_id().await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::error!(error = %err, "compute poller failed to list active executions");
            return;
        }
    };

    for execution in active {
        let Some(run_id) = execution.external_run_id.clone() else { continue };
        let status = match ctx.compute.poll_status(&run_id).await {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(execution_id = %execution.id, error = %err, "compute poller failed to poll run");
                continue;
            }
        };
        match status {
            RunStatus::Running => {}
            RunStatus::Completed { result } => {
                tracing::info!(execution_id = %execution.id, "compute backend reported run completed");
                ctx.bus.publish(Event::AgentCompleted { execution_id: execution.id, result, checkpoint: None });
            }
            RunStatus::Failed { error } => {
                tracing::info!(execution_id = %execution.id, "compute backend reported run failed");
                ctx.bus.publish(Event::AgentFailed { execution_id: execution.id, error });
            }
        }
    }
}

/// Spawns the recurring loop: a tick every `compute_poll_interval_seconds`.
/// Runs until aborted (the daemon aborts it on graceful shutdown).
pub fn spawn<C: Clock + Send + Sync + 'static>(ctx: AppContext<C>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(ctx.config.compute_poll_interval_seconds.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            run_once(&ctx).await;
        }
    })
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
