// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory stand-ins for the tracker and compute-backend seams, so the
//! scheduler and control loop can be driven deterministically in tests
//! without a GitHub token or a real compute grid.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`, mirroring
//! `oj-core`'s `test_support` module.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::compute::{ComputeBackend, RunStatus};
use crate::error::{ComputeBackendError, TrackerError};
use crate::tracker::{IssueComment, IssueDetails, IssueTrackerClient, PullRequestDetails, ReviewDetails};

/// An in-memory issue tracker. Tests seed it with [`FakeTracker::seed_issue`]
/// and then assert on label/comment state after a scheduler handler runs.
#[derive(Default)]
pub struct FakeTracker {
    issues: Mutex<HashMap<(String, i64), IssueDetails>>,
    comments: Mutex<HashMap<(String, i64), Vec<IssueComment>>>,
    pulls: Mutex<HashMap<String, Vec<PullRequestDetails>>>,
    reviews: Mutex<HashMap<(String, i64), Vec<ReviewDetails>>>,
    next_subissue: Mutex<i64>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self { next_subissue: Mutex::new(1000), ..Default::default() }
    }

    pub fn seed_issue(&self, issue: IssueDetails) {
        self.issues.lock().insert((issue.repo.clone(), issue.number), issue);
    }

    pub fn seed_comment(&self, repo: &str, number: i64, comment: IssueComment) {
        self.comments.lock().entry((repo.to_string(), number)).or_default().push(comment);
    }

    pub fn seed_pull_request(&self, repo: &str, pr: PullRequestDetails) {
        self.pulls.lock().entry(repo.to_string()).or_default().push(pr);
    }

    pub fn seed_review(&self, repo: &str, pr_number: i64, review: ReviewDetails) {
        self.reviews.lock().entry((repo.to_string(), pr_number)).or_default().push(review);
    }

    /// Current label set for an issue, for test assertions.
    pub fn labels(&self, repo: &str, number: i64) -> Vec<String> {
        self.issues.lock().get(&(repo.to_string(), number)).map(|i| i.labels.clone()).unwrap_or_default()
    }

    pub fn comments(&self, repo: &str, number: i64) -> Vec<IssueComment> {
        self.comments.lock().get(&(repo.to_string(), number)).cloned().unwrap_or_default()
    }

    pub fn is_closed(&self, repo: &str, number: i64) -> bool {
        self.issues.lock().get(&(repo.to_string(), number)).map(|i| i.closed).unwrap_or(false)
    }
}

#[async_trait]
impl IssueTrackerClient for FakeTracker {
    async fn get_issue(&self, repo: &str, number: i64) -> Result<IssueDetails, TrackerError> {
        self.issues
            .lock()
            .get(&(repo.to_string(), number))
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("{repo}#{number}")))
    }

    async fn list_issues(&self, repo: &str, labels: &[String]) -> Result<Vec<IssueDetails>, TrackerError> {
        Ok(self
            .issues
            .lock()
            .values()
            .filter(|i| i.repo == repo && !i.closed)
            .filter(|i| labels.is_empty() || labels.iter().any(|l| i.labels.contains(l)))
            .cloned()
            .collect())
    }

    async fn list_comments(&self, repo: &str, number: i64) -> Result<Vec<IssueComment>, TrackerError> {
        Ok(self.comments(repo, number))
    }

    async fn list_subissues(&self, repo: &str, parent_number: i64) -> Result<Vec<IssueDetails>, TrackerError> {
        Ok(self
            .issues
            .lock()
            .values()
            .filter(|i| i.repo == repo && i.body.contains(&format!("parent:{parent_number}")))
            .cloned()
            .collect())
    }

    async fn create_subissue(
        &self,
        repo: &str,
        parent_number: i64,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueDetails, TrackerError> {
        let number = {
            let mut next = self.next_subissue.lock();
            let n = *next;
            *next += 1;
            n
        };
        let issue = IssueDetails {
            number,
            repo: repo.to_string(),
            title: title.to_string(),
            body: format!("parent:{parent_number}\n{body}"),
            labels: labels.to_vec(),
            closed: false,
        };
        self.issues.lock().insert((repo.to_string(), number), issue.clone());
        Ok(issue)
    }

    async fn update_issue_status(&self, repo: &str, number: i64, closed: bool) -> Result<(), TrackerError> {
        if let Some(issue) = self.issues.lock().get_mut(&(repo.to_string(), number)) {
            issue.closed = closed;
        }
        Ok(())
    }

    async fn set_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError> {
        if let Some(issue) = self.issues.lock().get_mut(&(repo.to_string(), number)) {
            issue.labels.retain(|l| !l.starts_with("ag/"));
            if !issue.labels.contains(&label.to_string()) {
                issue.labels.push(label.to_string());
            }
        }
        Ok(())
    }

    async fn add_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError> {
        if let Some(issue) = self.issues.lock().get_mut(&(repo.to_string(), number)) {
            if !issue.labels.contains(&label.to_string()) {
                issue.labels.push(label.to_string());
            }
        }
        Ok(())
    }

    async fn remove_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError> {
        if let Some(issue) = self.issues.lock().get_mut(&(repo.to_string(), number)) {
            issue.labels.retain(|l| l != label);
        }
        Ok(())
    }

    async fn post_comment(&self, repo: &str, number: i64, body: &str) -> Result<(), TrackerError> {
        self.comments.lock().entry((repo.to_string(), number)).or_default().push(IssueComment {
            body: body.to_string(),
            author: "agent-grid[bot]".to_string(),
            is_bot: true,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_agent_pull_requests(&self, repo: &str) -> Result<Vec<PullRequestDetails>, TrackerError> {
        Ok(self.pulls.lock().get(repo).cloned().unwrap_or_default())
    }

    async fn list_reviews(&self, repo: &str, pr_number: i64) -> Result<Vec<ReviewDetails>, TrackerError> {
        Ok(self.reviews.lock().get(&(repo.to_string(), pr_number)).cloned().unwrap_or_default())
    }
}

/// Run-state tracked per launch, reported back by `poll_status`.
#[derive(Clone)]
enum FakeRun {
    Running,
    Completed(Option<String>),
    Failed(Option<String>),
}

/// An in-memory compute backend. Defaults to leaving every launch
/// `Running` until the test calls [`FakeComputeBackend::complete`] or
/// [`FakeComputeBackend::fail`], so tests can assert on "launched but not
/// yet finished" states as well as terminal ones.
#[derive(Default)]
pub struct FakeComputeBackend {
    runs: Mutex<HashMap<String, FakeRun>>,
    launches: Mutex<Vec<String>>,
    /// When set, `launch_agent` fails immediately with this message instead
    /// of accepting the run — exercises the "compute-backend launch
    /// rejection" error-handling path (§7).
    reject_with: Mutex<Option<String>>,
}

impl FakeComputeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_next_launch(&self, reason: impl Into<String>) {
        *self.reject_with.lock() = Some(reason.into());
    }

    pub fn complete(&self, external_run_id: &str, result: Option<&str>) {
        self.runs.lock().insert(external_run_id.to_string(), FakeRun::Completed(result.map(str::to_string)));
    }

    pub fn fail(&self, external_run_id: &str, error: Option<&str>) {
        self.runs.lock().insert(external_run_id.to_string(), FakeRun::Failed(error.map(str::to_string)));
    }

    /// `external_run_id`s passed to `launch_agent`, in call order.
    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().clone()
    }
}

#[async_trait]
impl ComputeBackend for FakeComputeBackend {
    async fn launch_agent(&self, execution: &oj_core::Execution) -> Result<String, ComputeBackendError> {
        if let Some(reason) = self.reject_with.lock().take() {
            return Err(ComputeBackendError::SpawnFailed(reason));
        }
        let run_id = execution.id.to_string();
        self.runs.lock().insert(run_id.clone(), FakeRun::Running);
        self.launches.lock().push(run_id.clone());
        Ok(run_id)
    }

    async fn poll_status(&self, external_run_id: &str) -> Result<RunStatus, ComputeBackendError> {
        match self.runs.lock().get(external_run_id) {
            Some(FakeRun::Running) | None => Ok(RunStatus::Running),
            Some(FakeRun::Completed(result)) => Ok(RunStatus::Completed { result: result.clone() }),
            Some(FakeRun::Failed(error)) => Ok(RunStatus::Failed { error: error.clone() }),
        }
    }

    async fn cancel(&self, external_run_id: &str) -> Result<(), ComputeBackendError> {
        self.runs.lock().insert(external_run_id.to_string(), FakeRun::Failed(Some("cancelled".to_string())));
        Ok(())
    }
}

/// Convenience: an `Arc`-wrapped pair ready to thread into an `AppContext`.
pub fn fakes() -> (Arc<FakeTracker>, Arc<FakeComputeBackend>) {
    (Arc::new(FakeTracker::new()), Arc::new(FakeComputeBackend::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(repo: &str, number: i64, labels: &[&str]) -> IssueDetails {
        IssueDetails {
            number,
            repo: repo.to_string(),
            title: "test issue".to_string(),
            body: String::new(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            closed: false,
        }
    }

    #[tokio::test]
    async fn set_label_replaces_ag_prefixed_labels_only() {
        let tracker = FakeTracker::new();
        tracker.seed_issue(issue("acme/widgets", 1, &["ag/todo", "bug"]));
        tracker.set_label("acme/widgets", 1, "ag/in-progress").await.unwrap();
        let labels = tracker.labels("acme/widgets", 1);
        assert!(labels.contains(&"ag/in-progress".to_string()));
        assert!(labels.contains(&"bug".to_string()));
        assert!(!labels.contains(&"ag/todo".to_string()));
    }

    #[tokio::test]
    async fn compute_backend_defaults_to_running_until_completed() {
        let backend = FakeComputeBackend::new();
        let exec = oj_core::Execution::builder().build();
        let run_id = backend.launch_agent(&exec).await.unwrap();
        assert_eq!(backend.poll_status(&run_id).await.unwrap(), RunStatus::Running);
        backend.complete(&run_id, Some("done"));
        assert_eq!(backend.poll_status(&run_id).await.unwrap(), RunStatus::Completed { result: Some("done".to_string()) });
    }

    #[tokio::test]
    async fn launch_rejection_surfaces_as_spawn_failed() {
        let backend = FakeComputeBackend::new();
        backend.reject_next_launch("budget exhausted upstream");
        let exec = oj_core::Execution::builder().build();
        let err = backend.launch_agent(&exec).await.unwrap_err();
        assert!(matches!(err, ComputeBackendError::SpawnFailed(_)));
    }
}
