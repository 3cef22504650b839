// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `ag/*` label convention and the pipeline's trigger/handled sets.

/// Legacy and current labels that admit an issue into the pipeline.
///
/// Any `ag/*` label also triggers, checked separately via
/// [`is_trigger_label`] since the prefix form is open-ended.
pub const TRIGGER_LABELS: &[&str] = &["agent", "automated", "agent-grid"];

/// Labels that mark an issue as already in flight; the scanner must not
/// re-select an issue carrying any of these.
pub const HANDLED_LABELS: &[&str] = &[
    "ag/in-progress",
    "ag/blocked",
    "ag/waiting",
    "ag/planning",
    "ag/review-pending",
    "ag/done",
    "ag/failed",
    "ag/skipped",
    "ag/epic",
    "ag/sub-issue",
];

pub fn is_trigger_label(label: &str) -> bool {
    label.starts_with("ag/") || TRIGGER_LABELS.contains(&label)
}

pub fn is_handled_label(label: &str) -> bool {
    HANDLED_LABELS.contains(&label)
}

pub fn has_trigger_label<'a>(labels: impl IntoIterator<Item = &'a str>) -> bool {
    labels.into_iter().any(is_trigger_label)
}

pub fn has_handled_label<'a>(labels: impl IntoIterator<Item = &'a str>) -> bool {
    labels.into_iter().any(is_handled_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ag_prefixed_labels_always_trigger() {
        assert!(is_trigger_label("ag/todo"));
        assert!(is_trigger_label("ag/anything"));
    }

    #[test]
    fn legacy_labels_trigger() {
        assert!(is_trigger_label("agent"));
        assert!(is_trigger_label("automated"));
        assert!(is_trigger_label("agent-grid"));
    }

    #[test]
    fn unrelated_labels_do_not_trigger() {
        assert!(!is_trigger_label("bug"));
        assert!(!is_trigger_label("good first issue"));
    }

    #[test]
    fn handled_labels_block_rescan() {
        assert!(is_handled_label("ag/in-progress"));
        assert!(!is_handled_label("ag/todo"));
    }
}
