// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A directory-of-JSON-files tracker for local and dry-run deployments,
//! standing in for GitHub without any network dependency. One file per
//! issue at `<root>/<repo-with-slashes-escaped>/<number>.json`.
//!
//! PR/review operations return empty results: a filesystem deployment has
//! no pull requests, so the control loop's PR sweeps are no-ops against it.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::TrackerError;
use crate::tracker::{IssueComment, IssueDetails, IssueTrackerClient, PullRequestDetails, ReviewDetails};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileComment {
    body: String,
    #[serde(default = "default_author")]
    author: String,
    #[serde(default)]
    is_bot: bool,
    #[serde(default = "Utc::now")]
    created_at: chrono::DateTime<Utc>,
}

fn default_author() -> String {
    "human".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileIssue {
    number: i64,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    comments: Vec<FileComment>,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    parent: Option<i64>,
}

pub struct FilesystemTracker {
    root: PathBuf,
    // Serializes read-modify-write label edits against concurrent callers
    // within this process; the store's own locking covers cross-process use.
    lock: Mutex<()>,
}

impl FilesystemTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), lock: Mutex::new(()) }
    }

    fn repo_dir(&self, repo: &str) -> PathBuf {
        self.root.join(repo.replace('/', "__"))
    }

    fn issue_path(&self, repo: &str, number: i64) -> PathBuf {
        self.repo_dir(repo).join(format!("{number}.json"))
    }

    fn read_issue(path: &Path) -> Result<FileIssue, TrackerError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| TrackerError::Api { status: 0, body: e.to_string() })
    }

    fn write_issue(path: &Path, issue: &FileIssue) -> Result<(), TrackerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(issue).map_err(|e| TrackerError::Api { status: 0, body: e.to_string() })?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    fn to_details(repo: &str, issue: &FileIssue) -> IssueDetails {
        IssueDetails {
            number: issue.number,
            repo: repo.to_string(),
            title: issue.title.clone(),
            body: issue.body.clone(),
            labels: issue.labels.clone(),
            closed: issue.closed,
        }
    }

    fn next_number(&self, repo: &str) -> i64 {
        let dir = self.repo_dir(repo);
        let Ok(entries) = std::fs::read_dir(&dir) else { return 1 };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(|s| s.trim_end_matches(".json").to_string()))
            .filter_map(|s| s.parse::<i64>().ok())
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[async_trait]
impl IssueTrackerClient for FilesystemTracker {
    async fn get_issue(&self, repo: &str, number: i64) -> Result<IssueDetails, TrackerError> {
        let path = self.issue_path(repo, number);
        let _guard = self.lock.lock();
        if !path.exists() {
            return Err(TrackerError::NotFound(format!("{repo}#{number}")));
        }
        let issue = Self::read_issue(&path)?;
        Ok(Self::to_details(repo, &issue))
    }

    async fn list_issues(&self, repo: &str, labels: &[String]) -> Result<Vec<IssueDetails>, TrackerError> {
        let dir = self.repo_dir(repo);
        let _guard = self.lock.lock();
        let Ok(entries) = std::fs::read_dir(&dir) else { return Ok(Vec::new()) };
        let mut out = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let Ok(issue) = Self::read_issue(&entry.path()) else { continue };
            if issue.closed {
                continue;
            }
            if !labels.is_empty() && !issue.labels.iter().any(|l| labels.contains(l)) {
                continue;
            }
            out.push(Self::to_details(repo, &issue));
        }
        out.sort_by_key(|i| i.number);
        Ok(out)
    }

    async fn list_comments(&self, repo: &str, number: i64) -> Result<Vec<IssueComment>, TrackerError> {
        let path = self.issue_path(repo, number);
        let _guard = self.lock.lock();
        let issue = Self::read_issue(&path)?;
        Ok(issue
            .comments
            .into_iter()
            .map(|c| IssueComment { body: c.body, author: c.author, is_bot: c.is_bot, created_at: c.created_at })
            .collect())
    }

    async fn list_subissues(&self, repo: &str, parent_number: i64) -> Result<Vec<IssueDetails>, TrackerError> {
        let dir = self.repo_dir(repo);
        let _guard = self.lock.lock();
        let Ok(entries) = std::fs::read_dir(&dir) else { return Ok(Vec::new()) };
        let mut out = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let Ok(issue) = Self::read_issue(&entry.path()) else { continue };
            if issue.parent == Some(parent_number) {
                out.push(Self::to_details(repo, &issue));
            }
        }
        out.sort_by_key(|i| i.number);
        Ok(out)
    }

    async fn create_subissue(
        &self,
        repo: &str,
        parent_number: i64,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueDetails, TrackerError> {
        let _guard = self.lock.lock();
        let number = self.next_number(repo);
        let issue = FileIssue {
            number,
            title: title.to_string(),
            body: body.to_string(),
            labels: labels.to_vec(),
            comments: Vec::new(),
            closed: false,
            parent: Some(parent_number),
        };
        Self::write_issue(&self.issue_path(repo, number), &issue)?;
        Ok(Self::to_details(repo, &issue))
    }

    async fn update_issue_status(&self, repo: &str, number: i64, closed: bool) -> Result<(), TrackerError> {
        let path = self.issue_path(repo, number);
        let _guard = self.lock.lock();
        let mut issue = Self::read_issue(&path)?;
        issue.closed = closed;
        Self::write_issue(&path, &issue)
    }

    async fn set_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError> {
        let path = self.issue_path(repo, number);
        let _guard = self.lock.lock();
        let mut issue = Self::read_issue(&path)?;
        issue.labels.retain(|l| !l.starts_with("ag/") || l == label);
        if !issue.labels.iter().any(|l| l == label) {
            issue.labels.push(label.to_string());
        }
        Self::write_issue(&path, &issue)
    }

    async fn add_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError> {
        let path = self.issue_path(repo, number);
        let _guard = self.lock.lock();
        let mut issue = Self::read_issue(&path)?;
        if !issue.labels.iter().any(|l| l == label) {
            issue.labels.push(label.to_string());
        }
        Self::write_issue(&path, &issue)
    }

    async fn remove_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError> {
        let path = self.issue_path(repo, number);
        let _guard = self.lock.lock();
        let mut issue = Self::read_issue(&path)?;
        issue.labels.retain(|l| l != label);
        Self::write_issue(&path, &issue)
    }

    async fn post_comment(&self, repo: &str, number: i64, body: &str) -> Result<(), TrackerError> {
        let path = self.issue_path(repo, number);
        let _guard = self.lock.lock();
        let mut issue = Self::read_issue(&path)?;
        issue.comments.push(FileComment { body: body.to_string(), author: "agent-grid[bot]".to_string(), is_bot: true, created_at: Utc::now() });
        Self::write_issue(&path, &issue)
    }

    async fn list_agent_pull_requests(&self, _repo: &str) -> Result<Vec<PullRequestDetails>, TrackerError> {
        Ok(Vec::new())
    }

    async fn list_reviews(&self, _repo: &str, _pr_number: i64) -> Result<Vec<ReviewDetails>, TrackerError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(dir: &Path, repo: &str, number: i64, labels: &[&str]) {
        let issue = FileIssue {
            number,
            title: "test issue".to_string(),
            body: "body".to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            comments: vec![],
            closed: false,
            parent: None,
        };
        let tracker = FilesystemTracker::new(dir.to_path_buf());
        FilesystemTracker::write_issue(&tracker.issue_path(repo, number), &issue).unwrap();
    }

    #[tokio::test]
    async fn set_label_replaces_only_ag_labels() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), "acme/widgets", 1, &["bug", "ag/todo"]);
        let tracker = FilesystemTracker::new(dir.path().to_path_buf());

        tracker.set_label("acme/widgets", 1, "ag/in-progress").await.unwrap();

        let issue = tracker.get_issue("acme/widgets", 1).await.unwrap();
        assert!(issue.labels.contains(&"bug".to_string()));
        assert!(issue.labels.contains(&"ag/in-progress".to_string()));
        assert!(!issue.labels.contains(&"ag/todo".to_string()));
    }

    #[tokio::test]
    async fn remove_label_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), "acme/widgets", 2, &["ag/todo"]);
        let tracker = FilesystemTracker::new(dir.path().to_path_buf());

        tracker.remove_label("acme/widgets", 2, "ag/done").await.unwrap();
        let issue = tracker.get_issue("acme/widgets", 2).await.unwrap();
        assert_eq!(issue.labels, vec!["ag/todo"]);
    }

    #[tokio::test]
    async fn unknown_issue_errors_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FilesystemTracker::new(dir.path().to_path_buf());
        let err = tracker.get_issue("acme/widgets", 99).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_subissue_links_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), "acme/widgets", 1, &["ag/epic"]);
        let tracker = FilesystemTracker::new(dir.path().to_path_buf());

        let child = tracker
            .create_subissue("acme/widgets", 1, "part one", "do the first part", &["ag/sub-issue".to_string()])
            .await
            .unwrap();
        assert_eq!(child.number, 2);

        let subs = tracker.list_subissues("acme/widgets", 1).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].number, 2);
    }

    #[tokio::test]
    async fn list_issues_filters_closed_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), "acme/widgets", 1, &["ag/todo"]);
        seed(dir.path(), "acme/widgets", 2, &["bug"]);
        let tracker = FilesystemTracker::new(dir.path().to_path_buf());
        tracker.update_issue_status("acme/widgets", 2, true).await.unwrap();

        let open = tracker.list_issues("acme/widgets", &[]).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].number, 1);

        let filtered = tracker.list_issues("acme/widgets", &["ag/todo".to_string()]).await.unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[tokio::test]
    async fn post_comment_is_marked_bot() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), "acme/widgets", 1, &[]);
        let tracker = FilesystemTracker::new(dir.path().to_path_buf());
        tracker.post_comment("acme/widgets", 1, "hello").await.unwrap();
        let comments = tracker.list_comments("acme/widgets", 1).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].is_bot);
    }
}
