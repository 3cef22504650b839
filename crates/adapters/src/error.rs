// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the issue-tracker and compute-backend adapters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("issue tracker request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("issue tracker returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("issue not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed repo url: {0}")]
    MalformedRepoUrl(String),
}

#[derive(Debug, Error)]
pub enum ComputeBackendError {
    #[error("compute backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("compute backend returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("unknown run handle: {0}")]
    UnknownRun(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
