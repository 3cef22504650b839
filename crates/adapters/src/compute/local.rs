// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns agent runs as local subprocesses — the single-node deployment
//! path, standing in for a remote compute grid in dry-run/local setups.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use oj_core::Execution;
use parking_lot::Mutex;

use super::{ComputeBackend, RunStatus};
use crate::error::ComputeBackendError;

/// Shared outcome slot for a spawned run, written once by the reaper task.
struct RunState {
    status: Mutex<RunStatus>,
}

/// Runs `{command} {args...}` per launch, passing issue context as
/// environment variables (`AGENT_GRID_ISSUE_ID`, `AGENT_GRID_REPO_URL`,
/// `AGENT_GRID_MODE`, `AGENT_GRID_PROMPT`). `external_run_id` is the
/// execution's own id — a single process per execution, never reused.
pub struct LocalProcessBackend {
    command: String,
    args: Vec<String>,
    workdir: PathBuf,
    runs: Arc<Mutex<HashMap<String, Arc<RunState>>>>,
}

impl LocalProcessBackend {
    pub fn new(command: impl Into<String>, args: Vec<String>, workdir: impl Into<PathBuf>) -> Self {
        Self { command: command.into(), args, workdir: workdir.into(), runs: Arc::new(Mutex::new(HashMap::new())) }
    }
}

#[async_trait::async_trait]
impl ComputeBackend for LocalProcessBackend {
    async fn launch_agent(&self, execution: &Execution) -> Result<String, ComputeBackendError> {
        let run_id = execution.id.to_string();

        tokio::fs::create_dir_all(&self.workdir).await?;

        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.args(&self.args)
            .current_dir(&self.workdir)
            .env("AGENT_GRID_ISSUE_ID", &execution.issue_id)
            .env("AGENT_GRID_REPO_URL", &execution.repo_url)
            .env("AGENT_GRID_MODE", execution.mode.to_string())
            .env("AGENT_GRID_PROMPT", &execution.prompt)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let child = cmd.spawn().map_err(|e| ComputeBackendError::SpawnFailed(e.to_string()))?;

        let state = Arc::new(RunState { status: Mutex::new(RunStatus::Running) });
        self.runs.lock().insert(run_id.clone(), state.clone());

        let reaper_run_id = run_id.clone();
        tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(output) if output.status.success() => {
                    let result = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    *state.status.lock() = RunStatus::Completed { result: (!result.is_empty()).then_some(result) };
                }
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    tracing::warn!(run_id = %reaper_run_id, exit_status = %output.status, "local agent run failed");
                    *state.status.lock() = RunStatus::Failed { error: (!stderr.is_empty()).then_some(stderr) };
                }
                Err(e) => {
                    tracing::error!(run_id = %reaper_run_id, error = %e, "failed to wait on local agent run");
                    *state.status.lock() = RunStatus::Failed { error: Some(e.to_string()) };
                }
            }
        });

        Ok(run_id)
    }

    async fn poll_status(&self, external_run_id: &str) -> Result<RunStatus, ComputeBackendError> {
        let runs = self.runs.lock();
        let state = runs.get(external_run_id).ok_or_else(|| ComputeBackendError::UnknownRun(external_run_id.to_string()))?;
        Ok(state.status.lock().clone())
    }

    async fn cancel(&self, external_run_id: &str) -> Result<(), ComputeBackendError> {
        // The process isn't tracked past spawn, so cancellation here only
        // marks the run failed for polling purposes; the reaper task still
        // records whatever the process itself eventually reports.
        let runs = self.runs.lock();
        let state = runs.get(external_run_id).ok_or_else(|| ComputeBackendError::UnknownRun(external_run_id.to_string()))?;
        *state.status.lock() = RunStatus::Failed { error: Some("cancelled".to_string()) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_core::Execution;

    #[tokio::test]
    async fn launch_runs_command_and_reports_completion() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalProcessBackend::new("echo", vec!["hello".to_string()], dir.path().to_path_buf());
        let exec = Execution::builder().issue_id("1").build();

        let run_id = backend.launch_agent(&exec).await.unwrap();

        let mut status = backend.poll_status(&run_id).await.unwrap();
        let mut attempts = 0;
        while status == RunStatus::Running && attempts < 200 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            status = backend.poll_status(&run_id).await.unwrap();
            attempts += 1;
        }

        assert_eq!(status, RunStatus::Completed { result: Some("hello".to_string()) });
    }

    #[tokio::test]
    async fn polling_unknown_run_errors() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalProcessBackend::new("echo", vec![], dir.path().to_path_buf());
        let err = backend.poll_status("exe-does-not-exist").await.unwrap_err();
        assert!(matches!(err, ComputeBackendError::UnknownRun(_)));
    }
}
