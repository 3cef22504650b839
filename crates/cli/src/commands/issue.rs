// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj issue` — inspect derived issue state the coordinator has persisted.

use clap::{Args, Subcommand};
use oj_wire::{IssueStateSummary, Request, Response};

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct IssueArgs {
    #[command(subcommand)]
    pub command: IssueCommand,
}

#[derive(Subcommand)]
pub enum IssueCommand {
    /// List issue state for a repo, optionally filtered by classification.
    List {
        repo: String,
        /// simple|complex|blocked|skip
        #[arg(long)]
        classification: Option<String>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

pub async fn run(client: &DaemonClient, args: IssueArgs) -> Result<(), ExitError> {
    match args.command {
        IssueCommand::List { repo, classification, format } => {
            match client.send(Request::ListIssueStates { repo, classification }).await? {
                Response::IssueStates(rows) => print_list(&rows, format),
                Response::Error { message } => Err(ExitError::new(1, message)),
                other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
            }
        }
    }
}

fn print_list(rows: &[IssueStateSummary], format: OutputFormat) -> Result<(), ExitError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows).map_err(|err| ExitError::new(1, err.to_string()))?);
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("no tracked issues");
            }
            for state in rows {
                println!(
                    "#{}  {}  classification={}  retries={}  updated={}",
                    state.issue_number,
                    state.repo,
                    state.classification.as_deref().unwrap_or("-"),
                    state.retry_count,
                    state.updated_at,
                );
            }
        }
    }
    Ok(())
}
