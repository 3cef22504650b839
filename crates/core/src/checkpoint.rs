// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque per-issue context handed from one execution to the next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::execution::ExecutionId;

/// A checkpoint saved by a completed execution, replayed into the prompt
/// of whichever execution runs next on the same issue.
///
/// Not schematized beyond the two fields every prompt builder reads; the
/// store persists and forwards the `data` blob verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub issue_id: String,
    pub execution_id: ExecutionId,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(issue_id: impl Into<String>, execution_id: ExecutionId, data: serde_json::Value) -> Self {
        Self { issue_id: issue_id.into(), execution_id, data, created_at: Utc::now() }
    }

    pub fn context_summary(&self) -> Option<&str> {
        self.data.get("context_summary").and_then(|v| v.as_str())
    }

    pub fn decisions_made(&self) -> Option<&str> {
        self.data.get("decisions_made").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_summary_and_decisions_from_data() {
        let checkpoint = Checkpoint::new(
            "42",
            ExecutionId::new(),
            serde_json::json!({"context_summary": "wired the client", "decisions_made": "used reqwest"}),
        );
        assert_eq!(checkpoint.context_summary(), Some("wired the client"));
        assert_eq!(checkpoint.decisions_made(), Some("used reqwest"));
    }
}
