// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw webhook ingress records and deduplicator bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a stored webhook event.
    pub struct WebhookEventId("whk-");
}

/// A single persisted webhook delivery.
///
/// Invariant I2: `delivery_id` is unique; `Store::create_webhook_event`
/// absorbs duplicate deliveries silently rather than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: WebhookEventId,
    pub delivery_id: String,
    pub event_type: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coalesced_into: Option<WebhookEventId>,
    pub received_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    pub fn new(
        delivery_id: impl Into<String>,
        event_type: impl Into<String>,
        action: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: WebhookEventId::new(),
            delivery_id: delivery_id.into(),
            event_type: event_type.into(),
            action: action.into(),
            repo: None,
            issue_id: None,
            payload,
            processed: false,
            coalesced_into: None,
            received_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Extract a `labels` array from this event's payload, checking the
    /// top-level `labels` key first, then a nested `issue.labels` array of
    /// either bare strings or `{name: ...}` objects.
    pub fn extract_labels(&self) -> Vec<String> {
        if let Some(labels) = self.payload.get("labels").and_then(|v| v.as_array()) {
            return labels.iter().filter_map(label_name).collect();
        }
        if let Some(labels) = self
            .payload
            .get("issue")
            .and_then(|issue| issue.get("labels"))
            .and_then(|v| v.as_array())
        {
            return labels.iter().filter_map(label_name).collect();
        }
        Vec::new()
    }

    pub fn comment_body(&self) -> Option<&str> {
        self.payload.get("comment").and_then(|c| c.get("body")).and_then(|b| b.as_str())
    }
}

fn label_name(value: &serde_json::Value) -> Option<String> {
    if let Some(s) = value.as_str() {
        return Some(s.to_string());
    }
    value.get("name").and_then(|n| n.as_str()).map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_labels_from_top_level() {
        let event = WebhookEvent::new("d1", "issues", "labeled", serde_json::json!({"labels": ["agent", "ag/todo"]}));
        assert_eq!(event.extract_labels(), vec!["agent", "ag/todo"]);
    }

    #[test]
    fn extract_labels_from_nested_issue_objects() {
        let event = WebhookEvent::new(
            "d2",
            "issues",
            "opened",
            serde_json::json!({"issue": {"labels": [{"name": "ag/todo"}, {"name": "agent"}]}}),
        );
        assert_eq!(event.extract_labels(), vec!["ag/todo", "agent"]);
    }

    #[test]
    fn comment_body_reads_nested_field() {
        let event = WebhookEvent::new(
            "d3",
            "issue_comment",
            "created",
            serde_json::json!({"comment": {"body": "@agent-grid nudge"}}),
        );
        assert_eq!(event.comment_body(), Some("@agent-grid nudge"));
    }
}
