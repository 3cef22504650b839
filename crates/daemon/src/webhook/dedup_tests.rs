// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn event(event_type: &str, action: &str, payload: serde_json::Value) -> WebhookEvent {
    let mut event = WebhookEvent::new(format!("d-{action}-{}", event_type), event_type, action, payload);
    event.repo = Some("acme/widgets".to_string());
    event.issue_id = Some("42".to_string());
    event
}

#[test]
fn closed_anywhere_in_the_window_vetoes_everything() {
    let events = vec![
        event("issues", "opened", serde_json::json!({"issue": {"labels": [{"name": "ag/todo"}]}})),
        event("issues", "closed", serde_json::json!({})),
    ];
    let decision = analyze_event_sequence(&events);
    assert!(matches!(decision, ProcessingDecision::Drop { .. }));
}

#[test]
fn nudge_comment_always_emits_regardless_of_labels() {
    let events = vec![event("issue_comment", "created", serde_json::json!({"comment": {"body": "@agent-grid nudge please"}}))];
    let decision = analyze_event_sequence(&events);
    match decision {
        ProcessingDecision::Emit { event: Event::NudgeRequested { issue_id, repo, .. }, .. } => {
            assert_eq!(issue_id, "42");
            assert_eq!(repo.as_deref(), Some("acme/widgets"));
        }
        other => panic!("expected NudgeRequested, got {other:?}"),
    }
}

#[test]
fn opened_with_trigger_label_emits_issue_created() {
    let events = vec![event("issues", "opened", serde_json::json!({"issue": {"labels": [{"name": "ag/todo"}]}}))];
    let decision = analyze_event_sequence(&events);
    match decision {
        ProcessingDecision::Emit { event: Event::IssueCreated { issue_id, labels, .. }, .. } => {
            assert_eq!(issue_id, "42");
            assert_eq!(labels, vec!["ag/todo".to_string()]);
        }
        other => panic!("expected IssueCreated, got {other:?}"),
    }
}

#[test]
fn opened_without_trigger_label_drops() {
    let events = vec![event("issues", "opened", serde_json::json!({"issue": {"labels": [{"name": "bug"}]}}))];
    assert!(matches!(analyze_event_sequence(&events), ProcessingDecision::Drop { .. }));
}

#[test]
fn labeled_with_trigger_label_emits_issue_updated() {
    let events = vec![event("issues", "labeled", serde_json::json!({"issue": {"labels": [{"name": "ag/todo"}]}}))];
    let decision = analyze_event_sequence(&events);
    match decision {
        ProcessingDecision::Emit { event: Event::IssueUpdated { issue_id, action, .. }, .. } => {
            assert_eq!(issue_id, "42");
            assert_eq!(action, "labeled");
        }
        other => panic!("expected IssueUpdated, got {other:?}"),
    }
}

#[test]
fn no_actionable_events_drops() {
    let events = vec![event("issues", "assigned", serde_json::json!({}))];
    assert!(matches!(analyze_event_sequence(&events), ProcessingDecision::Drop { .. }));
}

#[test]
fn later_label_snapshot_wins_over_an_earlier_one() {
    let mut first = event("issues", "labeled", serde_json::json!({"issue": {"labels": [{"name": "ag/todo"}]}}));
    let mut second = event("issues", "labeled", serde_json::json!({"issue": {"labels": [{"name": "bug"}]}}));
    first.received_at = Utc::now() - chrono::Duration::seconds(10);
    second.received_at = Utc::now();
    let decision = analyze_event_sequence(&[first, second]);
    assert!(matches!(decision, ProcessingDecision::Drop { .. }));
}
