// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj budget` — total recorded token/duration usage across executions.

use clap::Args;
use oj_wire::{Request, Response};

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct BudgetArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn run(client: &DaemonClient, args: BudgetArgs) -> Result<(), ExitError> {
    match client.send(Request::BudgetStatus).await? {
        Response::Budget(budget) => {
            match args.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&budget)
                            .map_err(|err| ExitError::new(1, err.to_string()))?
                    );
                }
                OutputFormat::Text => {
                    println!("{}  {}", crate::color::header("tokens used"), budget.tokens_used);
                    println!("{}  {}", crate::color::header("duration seconds"), budget.duration_seconds);
                }
            }
            Ok(())
        }
        Response::Error { message } => Err(ExitError::new(1, message)),
        other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
    }
}
