// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj` — the thin admin CLI for the coordinator daemon (`ojd`).
//!
//! Every subcommand opens one connection to the daemon's local admin
//! socket, sends one [`oj_wire::Request`], prints the resulting
//! [`oj_wire::Response`], and exits. The daemon itself — the durable
//! store, event bus, scheduler, control loop, webhook ingress — lives in
//! `oj-daemon`/`oj-engine`; this binary has no state of its own.

mod client;
mod color;
mod commands;
mod exit_error;
mod output;

use clap::Parser;
use oj_wire::{Request, Response};

use client::DaemonClient;
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "oj", version = env!("BUILD_GIT_HASH"), styles = color::styles())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Daemon health, running-execution count, and pending-nudge count.
    Status(commands::status::StatusArgs),
    /// Total recorded token/duration usage across executions.
    Budget(commands::budget::BudgetArgs),
    /// Inspect and cancel agent executions.
    Execution(commands::execution::ExecutionArgs),
    /// Inspect derived per-issue classification state.
    Issue(commands::issue::IssueArgs),
    /// Queue a nudge for an issue by hand.
    Nudge(commands::nudge::NudgeArgs),
    /// Run every control-loop phase once, out of band from its interval.
    RunControlLoopOnce,
    /// Ask the daemon to stop its background tasks and exit cleanly.
    Shutdown,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = DaemonClient::from_env();

    let result = match cli.command {
        Command::Status(args) => commands::status::run(&client, args).await,
        Command::Budget(args) => commands::budget::run(&client, args).await,
        Command::Execution(args) => commands::execution::run(&client, args).await,
        Command::Issue(args) => commands::issue::run(&client, args).await,
        Command::Nudge(args) => commands::nudge::run(&client, args).await,
        Command::RunControlLoopOnce => run_control_loop_once(&client).await,
        Command::Shutdown => shutdown(&client).await,
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.code);
    }
}

async fn run_control_loop_once(client: &DaemonClient) -> Result<(), ExitError> {
    match client.send(Request::RunControlLoopOnce).await? {
        Response::Ack => {
            println!("control loop cycle complete");
            Ok(())
        }
        Response::Error { message } => Err(ExitError::new(1, message)),
        other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
    }
}

async fn shutdown(client: &DaemonClient) -> Result<(), ExitError> {
    match client.send(Request::Shutdown).await? {
        Response::Ack => {
            println!("daemon is shutting down");
            Ok(())
        }
        Response::Error { message } => Err(ExitError::new(1, message)),
        other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
    }
}
