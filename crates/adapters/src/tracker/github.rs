// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub REST API v3 tracker client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::TrackerError;
use crate::tracker::{
    IssueComment, IssueDetails, IssueTrackerClient, PullRequestDetails, ReviewDetails, ReviewState,
};

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhIssue {
    number: i64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct GhComment {
    body: String,
    user: GhUser,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GhPullRequestRef {
    #[serde(rename = "ref")]
    branch: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GhPullRequest {
    number: i64,
    #[serde(default)]
    body: Option<String>,
    merged: bool,
    state: String,
    head: GhPullRequestRef,
}

#[derive(Debug, Deserialize)]
struct GhReview {
    state: String,
    #[serde(default)]
    body: Option<String>,
    user: GhUser,
    submitted_at: DateTime<Utc>,
}

pub struct GitHubTracker {
    client: Client,
    api_base: String,
    token: String,
}

impl GitHubTracker {
    pub fn new(token: impl Into<String>) -> Self {
        Self { client: Client::new(), api_base: "https://api.github.com".to_string(), token: token.into() }
    }

    #[cfg(test)]
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self { client: Client::new(), api_base: api_base.into(), token: token.into() }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "agent-grid")
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TrackerError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::Api { status, body })
    }

    fn to_details(repo: &str, issue: GhIssue) -> IssueDetails {
        IssueDetails {
            number: issue.number,
            repo: repo.to_string(),
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            closed: issue.state == "closed",
        }
    }
}

fn is_bot(user: &GhUser) -> bool {
    user.kind == "Bot" || user.login.ends_with("[bot]")
}

fn review_state(state: &str) -> Option<ReviewState> {
    match state {
        "CHANGES_REQUESTED" => Some(ReviewState::ChangesRequested),
        "COMMENTED" => Some(ReviewState::Commented),
        "APPROVED" => Some(ReviewState::Approved),
        _ => None,
    }
}

#[async_trait]
impl IssueTrackerClient for GitHubTracker {
    async fn get_issue(&self, repo: &str, number: i64) -> Result<IssueDetails, TrackerError> {
        let url = format!("{}/repos/{}/issues/{}", self.api_base, repo, number);
        let response = self.request(reqwest::Method::GET, url).send().await?;
        let response = Self::check_status(response).await?;
        let issue: GhIssue = response.json().await?;
        Ok(Self::to_details(repo, issue))
    }

    async fn list_issues(&self, repo: &str, labels: &[String]) -> Result<Vec<IssueDetails>, TrackerError> {
        let mut url = format!("{}/repos/{}/issues?state=open&per_page=100", self.api_base, repo);
        if !labels.is_empty() {
            url.push_str(&format!("&labels={}", labels.join(",")));
        }
        let response = self.request(reqwest::Method::GET, url).send().await?;
        let response = Self::check_status(response).await?;
        let issues: Vec<GhIssue> = response.json().await?;
        Ok(issues.into_iter().map(|i| Self::to_details(repo, i)).collect())
    }

    async fn list_comments(&self, repo: &str, number: i64) -> Result<Vec<IssueComment>, TrackerError> {
        let url = format!("{}/repos/{}/issues/{}/comments", self.api_base, repo, number);
        let response = self.request(reqwest::Method::GET, url).send().await?;
        let response = Self::check_status(response).await?;
        let comments: Vec<GhComment> = response.json().await?;
        Ok(comments
            .into_iter()
            .map(|c| IssueComment {
                is_bot: is_bot(&c.user),
                author: c.user.login,
                body: c.body,
                created_at: c.created_at,
            })
            .collect())
    }

    async fn list_subissues(&self, repo: &str, parent_number: i64) -> Result<Vec<IssueDetails>, TrackerError> {
        // GitHub's sub-issues API; falls back to an empty list if the repo
        // doesn't have the feature enabled (404 is not fatal here).
        let url = format!("{}/repos/{}/issues/{}/sub_issues", self.api_base, repo, parent_number);
        let response = self.request(reqwest::Method::GET, url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = Self::check_status(response).await?;
        let issues: Vec<GhIssue> = response.json().await?;
        Ok(issues.into_iter().map(|i| Self::to_details(repo, i)).collect())
    }

    async fn create_subissue(
        &self,
        repo: &str,
        parent_number: i64,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueDetails, TrackerError> {
        let url = format!("{}/repos/{}/issues", self.api_base, repo);
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&json!({ "title": title, "body": body, "labels": labels }))
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let issue: GhIssue = response.json().await?;
        let created = Self::to_details(repo, issue);

        let link_url = format!("{}/repos/{}/issues/{}/sub_issues", self.api_base, repo, parent_number);
        let link = self
            .request(reqwest::Method::POST, link_url)
            .json(&json!({ "sub_issue_id": created.number }))
            .send()
            .await?;
        // Best-effort: an older GitHub Enterprise instance without the
        // sub-issues feature still gets a created issue, just unlinked.
        let _ = Self::check_status(link).await;

        Ok(created)
    }

    async fn update_issue_status(&self, repo: &str, number: i64, closed: bool) -> Result<(), TrackerError> {
        let url = format!("{}/repos/{}/issues/{}", self.api_base, repo, number);
        let state = if closed { "closed" } else { "open" };
        let response = self.request(reqwest::Method::PATCH, url).json(&json!({ "state": state })).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn set_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError> {
        let current = self.get_issue(repo, number).await?;
        for existing in &current.labels {
            if existing.starts_with("ag/") && existing != label {
                self.remove_label(repo, number, existing).await?;
            }
        }
        if !current.labels.iter().any(|l| l == label) {
            self.add_label(repo, number, label).await?;
        }
        Ok(())
    }

    async fn add_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError> {
        let url = format!("{}/repos/{}/issues/{}/labels", self.api_base, repo, number);
        let response = self.request(reqwest::Method::POST, url).json(&json!({ "labels": [label] })).send().await?;
        // Already present is a 200, not an error — I6 tolerance comes for free from the API.
        Self::check_status(response).await?;
        Ok(())
    }

    async fn remove_label(&self, repo: &str, number: i64, label: &str) -> Result<(), TrackerError> {
        let url = format!("{}/repos/{}/issues/{}/labels/{}", self.api_base, repo, number, label);
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        // 404 means the label was already absent — tolerated per I6.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check_status(response).await?;
        Ok(())
    }

    async fn post_comment(&self, repo: &str, number: i64, body: &str) -> Result<(), TrackerError> {
        let url = format!("{}/repos/{}/issues/{}/comments", self.api_base, repo, number);
        let response = self.request(reqwest::Method::POST, url).json(&json!({ "body": body })).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn list_agent_pull_requests(&self, repo: &str) -> Result<Vec<PullRequestDetails>, TrackerError> {
        let url = format!("{}/repos/{}/pulls?state=all&per_page=100", self.api_base, repo);
        let response = self.request(reqwest::Method::GET, url).send().await?;
        let response = Self::check_status(response).await?;
        let prs: Vec<GhPullRequest> = response.json().await?;
        Ok(prs
            .into_iter()
            .filter(|pr| crate::is_agent_branch(&pr.head.branch))
            .map(|pr| PullRequestDetails {
                number: pr.number,
                branch: pr.head.branch,
                body: pr.body.unwrap_or_default(),
                merged: pr.merged,
                closed: pr.state == "closed",
                head_sha: pr.head.sha,
            })
            .collect())
    }

    async fn list_reviews(&self, repo: &str, pr_number: i64) -> Result<Vec<ReviewDetails>, TrackerError> {
        let url = format!("{}/repos/{}/pulls/{}/reviews", self.api_base, repo, pr_number);
        let response = self.request(reqwest::Method::GET, url).send().await?;
        let response = Self::check_status(response).await?;
        let reviews: Vec<GhReview> = response.json().await?;
        Ok(reviews
            .into_iter()
            .filter_map(|r| {
                let state = review_state(&r.state)?;
                Some(ReviewDetails {
                    state,
                    body: r.body.unwrap_or_default(),
                    is_bot: is_bot(&r.user),
                    author: r.user.login,
                    submitted_at: r.submitted_at,
                })
            })
            .collect())
    }
}
