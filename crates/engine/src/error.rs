// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the scheduler, control loop, and classifier.

use thiserror::Error;

use oj_adapters::{ComputeBackendError, TrackerError};
use oj_storage::StoreError;

/// Returned by [`crate::classifier::Classifier::classify`]. Per §7/§4.6
/// neither variant is retried — the caller (classify-and-act) maps both
/// straight into a [`oj_core::Classification`] default rather than
/// propagating failure to the scheduler.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier response was not valid JSON: {0}")]
    ParseError(String),
    #[error("classifier API call failed: {0}")]
    ApiError(String),
}

/// Top-level error composing every seam the scheduler and control loop
/// touch. Every handler logs this and aborts the current event/phase
/// rather than propagating — per §7's propagation rule, no error recovers
/// at the scheduler level, every handler is replayable on the next cycle.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    ComputeBackend(#[from] ComputeBackendError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("malformed nudge: {0}")]
    MalformedNudge(String),
    #[error("issue id is not a tracker-native number: {0}")]
    MalformedIssueId(String),
}
