// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Pluggable seams between the coordinator core and the outside world: the
//! issue tracker (GitHub or a filesystem stand-in) and the compute backend
//! (local subprocess or a remote grid's REST API).

pub mod compute;
pub mod error;
pub mod tracker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use compute::http::HttpComputeBackend;
pub use compute::local::LocalProcessBackend;
pub use compute::{ComputeBackend, RunStatus};
pub use error::{ComputeBackendError, TrackerError};
pub use tracker::filesystem::FilesystemTracker;
pub use tracker::github::GitHubTracker;
pub use tracker::{
    agent_branch_issue_number, is_agent_branch, parse_owner_repo, IssueComment, IssueDetails,
    IssueTrackerClient, PullRequestDetails, ReviewDetails, ReviewState,
};

#[cfg(any(test, feature = "test-support"))]
pub use test_support::{fakes, FakeComputeBackend, FakeTracker};
