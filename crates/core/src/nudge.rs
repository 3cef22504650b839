// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queued external requests to start work on a specific issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::execution::ExecutionId;

crate::define_id! {
    /// Unique identifier for a nudge request.
    pub struct NudgeId("ndg-");
}

/// An external command requesting immediate attention to a specific issue.
///
/// Ordering: pending nudges (`processed_at IS NULL`) are drained by
/// `(priority DESC, created_at ASC)` — higher priority first, oldest first
/// within a priority tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeRequest {
    pub id: NudgeId,
    pub issue_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_execution_id: Option<ExecutionId>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl NudgeRequest {
    pub fn new(issue_id: impl Into<String>) -> Self {
        Self {
            id: NudgeId::new(),
            issue_id: issue_id.into(),
            source_execution_id: None,
            priority: 0,
            reason: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    crate::setters! {
        set {
            priority: i32,
            source_execution_id: ExecutionId,
        }
        option {
            reason: String,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.processed_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_nudge_is_pending() {
        let nudge = NudgeRequest::new("42");
        assert!(nudge.is_pending());
        assert_eq!(nudge.priority, 0);
    }

    #[test]
    fn priority_setter_chains() {
        let nudge = NudgeRequest::new("42").priority(5);
        assert_eq!(nudge.priority, 5);
    }
}
