// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The issue-tracker seam: everything the scheduler needs from GitHub (or
//! a stand-in tracker for local/dry-run deployments) without depending on
//! GitHub's wire format directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TrackerError;

/// Title/body/labels for a single issue, as read back from the tracker.
#[derive(Debug, Clone)]
pub struct IssueDetails {
    pub number: i64,
    pub repo: String,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    #[allow(dead_code)]
    pub closed: bool,
}

/// A single comment on an issue or PR.
///
/// `is_bot` drives the unblocked-sweep's human-reply detection (§4.5 phase
/// 6): a reply counts as human when it carries no `[bot]`-suffixed author
/// and the tracker's own actor-type flag says it isn't a bot.
#[derive(Debug, Clone)]
pub struct IssueComment {
    pub body: String,
    pub author: String,
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
}

impl IssueComment {
    /// Carries the scheduler's `type=blocked` marker, embedded by
    /// `post_comment` when the classifier returns `BLOCKED`.
    pub fn is_blocked_marker(&self) -> bool {
        self.body.contains("type=blocked")
    }

    pub fn is_human(&self) -> bool {
        !self.is_bot && !self.author.ends_with("[bot]") && !self.is_blocked_marker()
    }
}

/// State of an open pull request on an agent branch.
#[derive(Debug, Clone)]
pub struct PullRequestDetails {
    pub number: i64,
    pub branch: String,
    pub body: String,
    pub merged: bool,
    pub closed: bool,
    pub head_sha: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    ChangesRequested,
    Commented,
    Approved,
}

#[derive(Debug, Clone)]
pub struct ReviewDetails {
    pub state: ReviewState,
    pub body: String,
    pub author: String,
    pub is_bot: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Abstraction over the issue tracker. `repo` is always `owner/name`
/// (no scheme, no `.git` suffix) — callers resolve from a clone URL via
/// [`parse_owner_repo`] before calling through this trait.
#[async_trait]
pub trait IssueTrackerClient: Send + Sync {
    async fn get_issue(&self, repo: &str, number: i64) -> Result<IssueDetails, TrackerError>;

    /// Open issues carrying at least one of `labels` (empty = no filter).
    async fn list_issues(&self, repo: &str, labels: &[String]) -> Result<Vec<IssueDetails>, TrackerError>;

    async fn list_comments(&self, repo: &str, number: i64) -> Result<Vec<IssueComment>, TrackerError>;

    async fn list_subissues(&self, repo: &str, parent_number: i64) -> Result<Vec<IssueDetails>, TrackerError>;

    async fn create_subissue(
        &self,
        repo: &str,
        parent_number: i64,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueDetails, TrackerError>;

    async fn update_issue_status(&self, repo: &str, number: i64, closed: bool) -> Result<(), TrackerError>;

    /// Remove every `ag/*` label, then add `label` — the label manager's
    /// I6-tolerant single-label transition. Idempotent: a label that's
    /// already absent/present is not an error.
    async fn set_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError>;

    async fn add_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError>;

    async fn remove_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError>;

    async fn post_comment(&self, repo: &str, number: i64, body: &str) -> Result<(), TrackerError>;

    /// Read-only escape hatch for the PR-review and closed-PR sweeps.
    /// Agent-opened PRs are identified by `agent/<issue_number>(-.*)?`
    /// branch names; callers correlate branch -> issue number themselves.
    async fn list_agent_pull_requests(&self, repo: &str) -> Result<Vec<PullRequestDetails>, TrackerError>;

    async fn list_reviews(&self, repo: &str, pr_number: i64) -> Result<Vec<ReviewDetails>, TrackerError>;
}

/// True for branch names matching `agent/<issue_number>(-.*)?` — the
/// convention every agent-opened branch follows, used to correlate PRs
/// and check runs back to the issue that spawned them.
pub fn is_agent_branch(branch: &str) -> bool {
    agent_branch_issue_number(branch).is_some()
}

/// Extract the issue number from an agent branch name, e.g.
/// `agent/42` or `agent/42-fix-thing` -> `42`. `None` for anything else.
pub fn agent_branch_issue_number(branch: &str) -> Option<i64> {
    let rest = branch.strip_prefix("agent/")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let suffix = &rest[digits.len()..];
    if suffix.is_empty() || suffix.starts_with('-') {
        digits.parse().ok()
    } else {
        None
    }
}

/// Extract `owner/repo` from a `https://github.com/<owner>/<repo>.git`
/// style clone URL. Grounded on the nudge fallback-resolution rule: a
/// non-matching URL means drop the nudge rather than guess.
pub fn parse_owner_repo(repo_url: &str) -> Option<String> {
    let trimmed = repo_url.trim_end_matches('/').trim_end_matches(".git");
    let path = trimmed.split("github.com/").nth(1)?;
    let mut parts = path.splitn(2, '/');
    let owner = parts.next()?;
    let repo = parts.next()?;
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(format!("{owner}/{repo}"))
}

pub mod github;
pub mod filesystem;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_clone_url() {
        assert_eq!(parse_owner_repo("https://github.com/acme/widgets.git"), Some("acme/widgets".to_string()));
    }

    #[test]
    fn parses_url_without_git_suffix() {
        assert_eq!(parse_owner_repo("https://github.com/acme/widgets"), Some("acme/widgets".to_string()));
    }

    #[test]
    fn rejects_non_github_url() {
        assert_eq!(parse_owner_repo("https://gitlab.com/acme/widgets.git"), None);
    }

    #[test]
    fn agent_branch_bare_number() {
        assert_eq!(agent_branch_issue_number("agent/42"), Some(42));
        assert!(is_agent_branch("agent/42"));
    }

    #[test]
    fn agent_branch_with_suffix() {
        assert_eq!(agent_branch_issue_number("agent/42-fix-thing"), Some(42));
    }

    #[test]
    fn non_agent_branch_rejected() {
        assert_eq!(agent_branch_issue_number("main"), None);
        assert_eq!(agent_branch_issue_number("agent42"), None);
        assert_eq!(agent_branch_issue_number("agent/abc"), None);
        assert!(!is_agent_branch("feature/agent/42"));
    }

    #[test]
    fn is_blocked_marker_and_human_detection() {
        let marker = IssueComment {
            body: "waiting on input {\"type\":\"blocked\",\"reason\":\"clarify\"}".into(),
            author: "agent-grid[bot]".into(),
            is_bot: true,
            created_at: Utc::now(),
        };
        assert!(marker.is_blocked_marker());
        assert!(!marker.is_human());

        let human = IssueComment { body: "use postgres".into(), author: "alice".into(), is_bot: false, created_at: Utc::now() };
        assert!(human.is_human());
    }
}
