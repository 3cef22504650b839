// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj execution` — inspect and cancel agent executions.

use clap::{Args, Subcommand};
use oj_wire::{ExecutionListFilter, ExecutionSummary, Request, Response};

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct ExecutionArgs {
    #[command(subcommand)]
    pub command: ExecutionCommand,
}

#[derive(Subcommand)]
pub enum ExecutionCommand {
    /// List executions, optionally filtered by issue or status.
    List {
        /// Only executions for this issue id.
        #[arg(long)]
        issue_id: Option<String>,
        /// Only executions in this status (pending|running|completed|failed).
        #[arg(long)]
        status: Option<String>,
        /// Maximum number of rows to print.
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show a single execution by id.
    Show {
        execution_id: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Ask the compute backend to cancel a run and mark it failed.
    Cancel { execution_id: String },
}

pub async fn run(client: &DaemonClient, args: ExecutionArgs) -> Result<(), ExitError> {
    match args.command {
        ExecutionCommand::List { issue_id, status, limit, format } => {
            let filter = ExecutionListFilter { issue_id, status, limit };
            match client.send(Request::ListExecutions { filter }).await? {
                Response::Executions(rows) => print_list(&rows, format),
                Response::Error { message } => Err(ExitError::new(1, message)),
                other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
            }
        }
        ExecutionCommand::Show { execution_id, format } => {
            match client.send(Request::GetExecution { execution_id: execution_id.clone() }).await? {
                Response::Execution(Some(exec)) => print_one(&exec, format),
                Response::Execution(None) => Err(ExitError::new(1, format!("no such execution: {execution_id}"))),
                Response::Error { message } => Err(ExitError::new(1, message)),
                other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
            }
        }
        ExecutionCommand::Cancel { execution_id } => match client.send(Request::CancelExecution { execution_id }).await? {
            Response::Ack => {
                println!("cancelled");
                Ok(())
            }
            Response::Error { message } => Err(ExitError::new(1, message)),
            other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
        },
    }
}

fn print_list(rows: &[ExecutionSummary], format: OutputFormat) -> Result<(), ExitError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows).map_err(|err| ExitError::new(1, err.to_string()))?);
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("no executions");
            }
            for exec in rows {
                println!(
                    "{}  issue={}  mode={}  status={}  started={}",
                    crate::color::header(&exec.id),
                    exec.issue_id,
                    exec.mode,
                    exec.status,
                    exec.started_at.as_deref().unwrap_or("-"),
                );
            }
        }
    }
    Ok(())
}

fn print_one(exec: &ExecutionSummary, format: OutputFormat) -> Result<(), ExitError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(exec).map_err(|err| ExitError::new(1, err.to_string()))?);
        }
        OutputFormat::Text => {
            println!("{}  {}", crate::color::header("id"), exec.id);
            println!("{}  {}", crate::color::header("issue"), exec.issue_id);
            println!("{}  {}", crate::color::header("repo"), exec.repo_url);
            println!("{}  {}", crate::color::header("mode"), exec.mode);
            println!("{}  {}", crate::color::header("status"), exec.status);
            println!("{}  {}", crate::color::header("external run id"), exec.external_run_id.as_deref().unwrap_or("-"));
            println!("{}  {}", crate::color::header("created"), exec.created_at);
            println!("{}  {}", crate::color::header("started"), exec.started_at.as_deref().unwrap_or("-"));
            println!("{}  {}", crate::color::header("completed"), exec.completed_at.as_deref().unwrap_or("-"));
        }
    }
    Ok(())
}
