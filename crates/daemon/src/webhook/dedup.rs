// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The webhook deduplicator (§4.4): a background poll loop that waits out
//! a quiet period per delivery, coalesces every event received for the
//! same `(repo, issue_id)` in that window into a single
//! [`oj_core::ProcessingDecision`], and emits at most one [`Event`] onto
//! the bus — invariant I3. Debounces "opened then immediately closed"
//! and similar noisy sequences that the raw ingress stream has no way to
//! collapse on its own.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use oj_core::{is_trigger_label, Event, EventBus, NudgeId, ProcessingDecision, WebhookEvent, WebhookEventId};
use oj_storage::Store;

const NUDGE_COMMAND: &str = "@agent-grid nudge";
const BATCH_LIMIT: i64 = 100;

pub fn spawn(store: Arc<Store>, bus: Arc<EventBus>, quiet_period_seconds: i64, poll_interval_seconds: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(poll_interval_seconds.max(1)));
        loop {
            interval.tick().await;
            if let Err(err) = process_batch(&store, &bus, quiet_period_seconds).await {
                tracing::error!(error = %err, "error processing webhook batch");
            }
        }
    })
}

async fn process_batch(store: &Store, bus: &EventBus, quiet_period_seconds: i64) -> Result<(), oj_storage::StoreError> {
    let cutoff = Utc::now() - chrono::Duration::seconds(quiet_period_seconds);
    let events = store.get_unprocessed_webhook_events(cutoff, BATCH_LIMIT).await?;
    if events.is_empty() {
        return Ok(());
    }
    tracing::debug!(count = events.len(), "processing webhook events");

    let mut by_issue: HashMap<(Option<String>, Option<String>), Vec<WebhookEvent>> = HashMap::new();
    for event in events {
        by_issue.entry((event.repo.clone(), event.issue_id.clone())).or_default().push(event);
    }

    for ((repo, issue_id), mut group) in by_issue {
        group.sort_by_key(|e| e.received_at);
        process_issue_events(store, bus, repo.as_deref(), issue_id.as_deref(), group).await?;
    }

    Ok(())
}

async fn process_issue_events(
    store: &Store,
    bus: &EventBus,
    repo: Option<&str>,
    issue_id: Option<&str>,
    events: Vec<WebhookEvent>,
) -> Result<(), oj_storage::StoreError> {
    let Some(primary) = events.first() else { return Ok(()) };
    let primary_id = primary.id;

    let decision = analyze_event_sequence(&events);
    match &decision {
        ProcessingDecision::Emit { event, .. } => {
            bus.publish(event.clone());
        }
        ProcessingDecision::Drop { .. } => {
            tracing::info!(
                repo = repo.unwrap_or(""),
                issue_id = issue_id.unwrap_or(""),
                reason = decision.reason(),
                coalesced = events.len(),
                "skipping coalesced webhook events"
            );
        }
    }

    let ids: Vec<WebhookEventId> = events.iter().map(|e| e.id).collect();
    let coalesced_into = if events.len() > 1 { Some(primary_id) } else { None };
    store.mark_webhook_events_processed(&ids, coalesced_into).await
}

/// Mirrors the original processor's sequence analysis: a closed event
/// anywhere in the run vetoes launching, a nudge comment always launches,
/// and otherwise the final label snapshot decides.
fn analyze_event_sequence(events: &[WebhookEvent]) -> ProcessingDecision {
    if events.iter().any(|e| e.action == "closed") {
        return ProcessingDecision::drop("issue was closed");
    }

    for event in events {
        if event.event_type == "issue_comment" && event.action == "created" {
            if let Some(body) = event.comment_body() {
                if body.to_lowercase().contains(NUDGE_COMMAND) {
                    let Some((repo, issue_id)) = event.repo.clone().zip(event.issue_id.clone()) else { continue };
                    return ProcessingDecision::emit(
                        Event::NudgeRequested {
                            nudge_id: NudgeId::new().to_string(),
                            issue_id,
                            repo: Some(repo),
                            source_execution_id: None,
                            priority: 0,
                            reason: Some("nudge command in comment".to_string()),
                        },
                        "nudge command in comment",
                    );
                }
            }
        }
    }

    let has_opened = events.iter().any(|e| e.action == "opened");
    let has_labeled = events.iter().any(|e| e.action == "labeled");
    let final_labels = events.iter().rev().find_map(|e| {
        let labels = e.extract_labels();
        (!labels.is_empty()).then_some(labels)
    });
    let has_trigger_label = final_labels.as_ref().is_some_and(|labels| labels.iter().any(|l| is_trigger_label(l)));

    let Some((repo, issue_id)) = events[0].repo.clone().zip(events[0].issue_id.clone()) else {
        return ProcessingDecision::drop("event carries no repo/issue identity");
    };
    let labels = final_labels.unwrap_or_default();

    if has_opened && has_trigger_label {
        return ProcessingDecision::emit(
            Event::IssueCreated { issue_id, repo, labels },
            "issue opened with trigger label",
        );
    }
    if has_opened {
        return ProcessingDecision::drop("issue opened without trigger label");
    }
    if has_labeled && has_trigger_label {
        return ProcessingDecision::emit(
            Event::IssueUpdated { issue_id, repo, action: "labeled".to_string(), labels },
            "trigger label added",
        );
    }

    ProcessingDecision::drop("no actionable events in this window")
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
