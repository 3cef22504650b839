// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub webhook ingress (§4.4): verify, persist, answer. Every accepted
//! delivery is durably stored before this handler returns — invariant I2
//! relies on `create_webhook_event`'s `ON CONFLICT (delivery_id) DO
//! NOTHING`, so a retried delivery is absorbed silently rather than
//! double-processed.
//!
//! `issues`/`issue_comment` deliveries are classification candidates: the
//! deduplicator coalesces a burst of them into a single decision after the
//! quiet period. `pull_request`, `pull_request_review`, and `check_run`
//! deliveries carry no such ambiguity — one delivery is one fact about one
//! PR or check run — so, mirroring the original adapter's separate
//! non-coalescing webhook path, this handler publishes their canonical
//! event directly once persisted, rather than waiting on the dedup loop.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use hmac::{Hmac, Mac};
use oj_core::{Event, EventBus, PrReviewState, WebhookEvent};
use oj_storage::Store;
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub struct IngressState {
    pub store: Arc<Store>,
    pub bus: Arc<EventBus>,
    pub webhook_secret: String,
}

pub fn router(state: Arc<IngressState>) -> Router {
    Router::new().route("/webhooks/github", post(handle_github_webhook)).with_state(state)
}

async fn handle_github_webhook(
    State(state): State<Arc<IngressState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let event_type = headers.get("x-github-event").and_then(|v| v.to_str().ok()).ok_or(StatusCode::BAD_REQUEST)?;
    let delivery_id = headers.get("x-github-delivery").and_then(|v| v.to_str().ok()).ok_or(StatusCode::BAD_REQUEST)?;
    let signature = headers.get("x-hub-signature-256").and_then(|v| v.to_str().ok());

    if !state.webhook_secret.is_empty() && !verify_signature(&body, signature, &state.webhook_secret) {
        tracing::warn!(event_type, "rejected webhook delivery with invalid signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|err| {
        tracing::error!(event_type, error = %err, "failed to parse webhook JSON");
        StatusCode::BAD_REQUEST
    })?;

    if event_type == "ping" {
        return Ok(Json(serde_json::json!({"status": "pong"})));
    }

    let action = payload.get("action").and_then(|a| a.as_str()).unwrap_or_default().to_string();
    let (repo, issue_id) = repo_and_issue(event_type, &payload);

    let mut event = WebhookEvent::new(delivery_id, event_type, action, payload);
    event.repo = repo;
    event.issue_id = issue_id;
    let event_id = event.id;

    let stored = match state.store.create_webhook_event(&event).await {
        Ok(stored) => stored,
        Err(err) => {
            tracing::error!(delivery_id, error = %err, "failed to store webhook delivery");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if !stored {
        tracing::debug!(delivery_id, event_type, "duplicate webhook delivery absorbed");
        return Ok(Json(serde_json::json!({"status": "duplicate", "delivery_id": delivery_id})));
    }
    tracing::info!(delivery_id, event_type, "webhook delivery stored");

    // pull_request/pull_request_review/check_run deliveries are unambiguous
    // on their own, so publish them immediately instead of routing through
    // the issue-event coalescing decision table.
    if let Some(direct) = direct_event(event_type, &event.payload) {
        state.bus.publish(direct);
        if let Err(err) = state.store.mark_webhook_events_processed(&[event_id], None).await {
            tracing::error!(delivery_id, error = %err, "failed to mark directly-published webhook event processed");
        }
    }

    Ok(Json(serde_json::json!({"status": "queued", "delivery_id": delivery_id})))
}

fn verify_signature(payload: &[u8], signature: Option<&str>, secret: &str) -> bool {
    let Some(signature) = signature else { return false };
    let Some(hex_digest) = signature.strip_prefix("sha256=") else { return false };
    let Ok(expected) = hex::decode(hex_digest) else { return false };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else { return false };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Extract the `(repo, issue_id)` this delivery concerns, when the event
/// type carries one — mirrors the original processor's per-event-type
/// payload shape.
fn repo_and_issue(event_type: &str, payload: &Value) -> (Option<String>, Option<String>) {
    let repo = payload.get("repository").and_then(|r| r.get("full_name")).and_then(|v| v.as_str()).map(String::from);

    let issue_id = match event_type {
        "issues" | "issue_comment" => payload.get("issue").and_then(|i| i.get("number")).and_then(|v| v.as_i64()).map(|n| n.to_string()),
        "pull_request" | "pull_request_review" | "pull_request_review_comment" | "check_run" => None,
        _ => None,
    };

    (repo, issue_id)
}

/// Builds the canonical [`Event`] for a `pull_request`, `pull_request_review`,
/// `pull_request_review_comment`, or `check_run` delivery, when the PR/check
/// concerns an agent branch. Grounded on `webhook_handler.py`'s separate,
/// non-coalescing handling of these event types — unlike `issues`/
/// `issue_comment`, a single delivery here is never ambiguous, so there is
/// nothing for the deduplicator's quiet period to usefully wait out.
fn direct_event(event_type: &str, payload: &Value) -> Option<Event> {
    match event_type {
        "pull_request" => direct_pr_closed(payload),
        "pull_request_review" => direct_pr_review(payload),
        "pull_request_review_comment" => direct_pr_review_comment(payload),
        "check_run" => direct_check_run_failed(payload),
        _ => None,
    }
}

fn agent_branch(payload: &Value) -> Option<String> {
    let branch = payload.get("pull_request")?.get("head")?.get("ref")?.as_str()?;
    branch.starts_with("agent/").then(|| branch.to_string())
}

fn direct_pr_closed(payload: &Value) -> Option<Event> {
    if payload.get("action").and_then(|a| a.as_str()) != Some("closed") {
        return None;
    }
    let branch = agent_branch(payload)?;
    let repo = payload.get("repository")?.get("full_name")?.as_str()?.to_string();
    let pr = payload.get("pull_request")?;
    Some(Event::PrClosed {
        repo,
        issue_id: None,
        pr_number: pr.get("number").and_then(|v| v.as_i64())?,
        branch,
        merged: pr.get("merged").and_then(|v| v.as_bool()).unwrap_or(false),
    })
}

fn direct_pr_review(payload: &Value) -> Option<Event> {
    if payload.get("action").and_then(|a| a.as_str()) != Some("submitted") {
        return None;
    }
    let branch = agent_branch(payload)?;
    let repo = payload.get("repository")?.get("full_name")?.as_str()?.to_string();
    let pr = payload.get("pull_request")?;
    let review = payload.get("review")?;
    let state = match review.get("state").and_then(|v| v.as_str())?.to_lowercase().as_str() {
        "changes_requested" => PrReviewState::ChangesRequested,
        "commented" => PrReviewState::Commented,
        "approved" => PrReviewState::Approved,
        _ => return None,
    };
    Some(Event::PrReview {
        repo,
        issue_id: None,
        pr_number: pr.get("number").and_then(|v| v.as_i64())?,
        branch,
        state,
        body: review.get("body").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
    })
}

/// Inline review comments carry no aggregate `state`; they are always
/// surfaced as `COMMENTED`, matching `_handle_pr_review_comment_event`.
fn direct_pr_review_comment(payload: &Value) -> Option<Event> {
    if payload.get("action").and_then(|a| a.as_str()) != Some("created") {
        return None;
    }
    let branch = agent_branch(payload)?;
    let repo = payload.get("repository")?.get("full_name")?.as_str()?.to_string();
    let pr = payload.get("pull_request")?;
    let body = payload.get("comment").and_then(|c| c.get("body")).and_then(|v| v.as_str()).unwrap_or_default().to_string();
    Some(Event::PrReview {
        repo,
        issue_id: None,
        pr_number: pr.get("number").and_then(|v| v.as_i64())?,
        branch,
        state: PrReviewState::Commented,
        body,
    })
}

/// A `check_run` delivery whose conclusion is a failure, on an agent
/// branch — surfaced via the check run's owning pull request(s), the only
/// place GitHub's payload names the branch for a check suite.
fn direct_check_run_failed(payload: &Value) -> Option<Event> {
    let check_run = payload.get("check_run")?;
    if payload.get("action").and_then(|a| a.as_str()) != Some("completed") {
        return None;
    }
    if check_run.get("conclusion").and_then(|v| v.as_str()) != Some("failure") {
        return None;
    }
    let repo = payload.get("repository")?.get("full_name")?.as_str()?.to_string();
    let pull_requests = check_run.get("pull_requests").and_then(|v| v.as_array())?;
    let pr = pull_requests.iter().find_map(|pr| {
        let branch = pr.get("head")?.get("ref")?.as_str()?;
        branch.starts_with("agent/").then(|| (branch.to_string(), pr.get("number").and_then(|v| v.as_i64())))
    });
    let (branch, pr_number) = pr?;
    Some(Event::CheckRunFailed {
        repo,
        branch,
        pr_number,
        head_sha: check_run.get("head_sha").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        check_name: check_run.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        check_output: check_run
            .get("output")
            .and_then(|o| o.get("summary"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        check_url: check_run.get("html_url").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
    })
}
