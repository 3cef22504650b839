// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj status` — daemon health snapshot.

use clap::Args;
use oj_wire::{Request, Response};

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn run(client: &DaemonClient, args: StatusArgs) -> Result<(), ExitError> {
    match client.send(Request::Status).await? {
        Response::Status(status) => {
            match args.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&status)
                            .map_err(|err| ExitError::new(1, err.to_string()))?
                    );
                }
                OutputFormat::Text => {
                    println!("{}  {}", crate::color::header("deployment mode"), status.deployment_mode);
                    println!("{}  {}", crate::color::header("dry run"), status.dry_run);
                    println!("{}  {}", crate::color::header("running executions"), status.running_executions);
                    println!("{}  {}", crate::color::header("pending nudges"), status.pending_nudges);
                }
            }
            Ok(())
        }
        Response::Error { message } => Err(ExitError::new(1, message)),
        other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
    }
}
