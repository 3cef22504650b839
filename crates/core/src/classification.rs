// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classifier output: what kind of work an issue represents.

use serde::{Deserialize, Serialize};

/// The four buckets the classifier sorts an issue into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClassificationCategory {
    Simple,
    Complex,
    Blocked,
    Skip,
}

crate::simple_display! {
    ClassificationCategory {
        Simple => "SIMPLE",
        Complex => "COMPLEX",
        Blocked => "BLOCKED",
        Skip => "SKIP",
    }
}

impl ClassificationCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SIMPLE" => Some(Self::Simple),
            "COMPLEX" => Some(Self::Complex),
            "BLOCKED" => Some(Self::Blocked),
            "SKIP" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Result of classifying an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: ClassificationCategory,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_question: Option<String>,
    #[serde(default = "default_complexity")]
    pub estimated_complexity: u8,
    #[serde(default)]
    pub dependencies: Vec<i64>,
}

fn default_complexity() -> u8 {
    5
}

impl Classification {
    pub fn parse_error() -> Self {
        Self {
            category: ClassificationCategory::Simple,
            reason: "Classification parse error, defaulting to SIMPLE".to_string(),
            blocking_question: None,
            estimated_complexity: default_complexity(),
            dependencies: Vec::new(),
        }
    }

    pub fn api_error(detail: impl std::fmt::Display) -> Self {
        Self {
            category: ClassificationCategory::Skip,
            reason: format!("Classification error: {detail}"),
            blocking_question: None,
            estimated_complexity: default_complexity(),
            dependencies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_defaults_to_simple() {
        let c = Classification::parse_error();
        assert_eq!(c.category, ClassificationCategory::Simple);
    }

    #[test]
    fn api_error_defaults_to_skip() {
        let c = Classification::api_error("timeout");
        assert_eq!(c.category, ClassificationCategory::Skip);
        assert!(c.reason.contains("timeout"));
    }
}
