// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compute backend fronted by a remote grid's REST API: `POST /runs` to
//! launch, `GET /runs/{id}` to poll, `POST /runs/{id}/cancel` to cancel.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ComputeBackend, RunStatus};
use crate::error::ComputeBackendError;
use oj_core::Execution;

#[derive(Debug, Serialize)]
struct LaunchRequest<'a> {
    issue_id: &'a str,
    repo_url: &'a str,
    mode: String,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpoint: Option<&'a serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct LaunchResponse {
    run_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum PollResponse {
    Running,
    Completed { result: Option<String> },
    Failed { error: Option<String> },
}

pub struct HttpComputeBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpComputeBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into(), api_key: api_key.into() }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path)).bearer_auth(&self.api_key)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ComputeBackendError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(ComputeBackendError::Api { status, body })
    }
}

#[async_trait]
impl ComputeBackend for HttpComputeBackend {
    async fn launch_agent(&self, execution: &Execution) -> Result<String, ComputeBackendError> {
        let body = LaunchRequest {
            issue_id: &execution.issue_id,
            repo_url: &execution.repo_url,
            mode: execution.mode.to_string(),
            prompt: &execution.prompt,
            checkpoint: execution.checkpoint.as_ref(),
        };
        let response = self.request(reqwest::Method::POST, "/runs").json(&body).send().await?;
        let response = Self::check_status(response).await?;
        let launched: LaunchResponse = response.json().await?;
        Ok(launched.run_id)
    }

    async fn poll_status(&self, external_run_id: &str) -> Result<RunStatus, ComputeBackendError> {
        let response = self.request(reqwest::Method::GET, &format!("/runs/{external_run_id}")).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ComputeBackendError::UnknownRun(external_run_id.to_string()));
        }
        let response = Self::check_status(response).await?;
        let polled: PollResponse = response.json().await?;
        Ok(match polled {
            PollResponse::Running => RunStatus::Running,
            PollResponse::Completed { result } => RunStatus::Completed { result },
            PollResponse::Failed { error } => RunStatus::Failed { error },
        })
    }

    async fn cancel(&self, external_run_id: &str) -> Result<(), ComputeBackendError> {
        let response = self.request(reqwest::Method::POST, &format!("/runs/{external_run_id}/cancel")).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
