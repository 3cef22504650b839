// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The compute-backend seam: wherever agent sessions actually run. The
//! scheduler and control loop never talk to a backend directly — both
//! call through the shared launch subroutine, which calls this trait.

use async_trait::async_trait;
use oj_core::{Execution, ExecutionId};

use crate::error::ComputeBackendError;

/// Backend-reported state for a previously launched run, polled by the
/// control loop's restart-recovery and timeout sweep phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed { result: Option<String> },
    Failed { error: Option<String> },
}

#[async_trait]
pub trait ComputeBackend: Send + Sync {
    /// Start a run for `execution` and return an opaque handle
    /// (`external_run_id`) used to poll or cancel it later.
    async fn launch_agent(&self, execution: &Execution) -> Result<String, ComputeBackendError>;

    async fn poll_status(&self, external_run_id: &str) -> Result<RunStatus, ComputeBackendError>;

    async fn cancel(&self, external_run_id: &str) -> Result<(), ComputeBackendError>;
}

/// Convenience used by callers that only have an [`ExecutionId`] on hand
/// (e.g. a log line) rather than the full [`Execution`].
pub fn run_label(execution_id: ExecutionId) -> String {
    execution_id.to_string()
}

pub mod http;
pub mod local;
