// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived per-issue state: classification, retry/CI-fix counters, metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::ClassificationCategory;

/// Derived record for one `(issue_number, repo)` pair.
///
/// Upserted with merge semantics: `None` arguments to the store's
/// `upsert_issue_state` preserve the prior value for `classification`,
/// `metadata`, and `last_checked_at`; `retry_count` is always overwritten
/// when supplied since callers compute the new value themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueState {
    pub issue_number: i64,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationCategory>,
    #[serde(default)]
    pub retry_count: i32,
    /// Opaque fields such as `ci_fix_count` and `last_ci_check_sha`.
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl IssueState {
    pub fn new(issue_number: i64, repo: impl Into<String>) -> Self {
        Self {
            issue_number,
            repo: repo.into(),
            classification: None,
            retry_count: 0,
            metadata: serde_json::json!({}),
            last_checked_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn ci_fix_count(&self) -> i64 {
        self.metadata.get("ci_fix_count").and_then(|v| v.as_i64()).unwrap_or(0)
    }

    pub fn last_ci_check_sha(&self) -> Option<&str> {
        self.metadata.get("last_ci_check_sha").and_then(|v| v.as_str())
    }
}

/// Patch passed to `Store::upsert_issue_state`. Every field is optional;
/// absent fields preserve the prior value (except `retry_count`, which
/// overwrites when present).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueStatePatch {
    pub classification: Option<ClassificationCategory>,
    pub retry_count: Option<i32>,
    pub metadata_merge: Option<serde_json::Value>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl IssueStatePatch {
    pub fn classification(mut self, c: ClassificationCategory) -> Self {
        self.classification = Some(c);
        self
    }

    pub fn retry_count(mut self, n: i32) -> Self {
        self.retry_count = Some(n);
        self
    }

    pub fn merge_metadata(mut self, value: serde_json::Value) -> Self {
        self.metadata_merge = Some(value);
        self
    }

    pub fn last_checked_now(mut self, now: DateTime<Utc>) -> Self {
        self.last_checked_at = Some(now);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_issue_state_has_no_classification() {
        let state = IssueState::new(42, "acme/widgets");
        assert!(state.classification.is_none());
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.ci_fix_count(), 0);
    }

    #[test]
    fn ci_fix_count_reads_from_metadata() {
        let mut state = IssueState::new(15, "acme/widgets");
        state.metadata = serde_json::json!({"ci_fix_count": 2, "last_ci_check_sha": "abc123"});
        assert_eq!(state.ci_fix_count(), 2);
        assert_eq!(state.last_ci_check_sha(), Some("abc123"));
    }
}
