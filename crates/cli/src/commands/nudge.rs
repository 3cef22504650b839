// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj nudge` — queue a nudge by hand, the same thing a
//! `@agent-grid nudge` comment produces via the webhook path.

use clap::Args;
use oj_wire::{Request, Response};

use crate::client::DaemonClient;
use crate::exit_error::ExitError;

#[derive(Args)]
pub struct NudgeArgs {
    /// External issue id to nudge.
    pub issue_id: String,
    /// Optional human-readable reason recorded alongside the nudge.
    #[arg(long)]
    pub reason: Option<String>,
}

pub async fn run(client: &DaemonClient, args: NudgeArgs) -> Result<(), ExitError> {
    match client.send(Request::TriggerNudge { issue_id: args.issue_id, reason: args.reason }).await? {
        Response::NudgeQueued(summary) => {
            println!(
                "queued nudge {} for issue {} (priority {})",
                summary.id, summary.issue_id, summary.priority
            );
            Ok(())
        }
        Response::Error { message } => Err(ExitError::new(1, message)),
        other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
    }
}
