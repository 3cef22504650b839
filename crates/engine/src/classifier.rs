// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classifier: the LLM-backed policy that sorts an issue into
//! SIMPLE/COMPLEX/BLOCKED/SKIP. Sub-issue decomposition for COMPLEX issues
//! is not performed here — per §4.6 the scheduler only launches a planning
//! agent, which does its own decomposition via the compute backend; this
//! module's contract ends at the category decision.

use async_trait::async_trait;
use oj_adapters::IssueDetails;
use oj_core::{Classification, ClassificationCategory};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// The policy seam: given an issue and its comment history, decide what
/// kind of work it is. A trait so tests can swap in a scripted double
/// instead of calling the real Anthropic API.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, issue: &IssueDetails, comments: &[String]) -> Classification;
}

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Talks to Anthropic's Messages API directly, the way the compute
/// backends talk to their respective REST APIs.
pub struct AnthropicClassifier {
    client: Client,
    api_key: String,
    model: String,
}

impl AnthropicClassifier {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: Client::new(), api_key: api_key.into(), model: model.into() }
    }

    async fn call(&self, system: &str, user: &str) -> Result<String, ClassifierError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: 1024,
            system,
            messages: vec![Message { role: "user", content: user }],
        };
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::ApiError(format!("HTTP {status}: {text}")));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| ClassifierError::ApiError(e.to_string()))?;
        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| ClassifierError::ApiError("empty response content".to_string()))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

/// Raw shape the classification prompt asks for, parsed then widened into
/// the richer [`Classification`] the rest of the engine works with.
#[derive(Deserialize)]
struct RawClassification {
    category: String,
    reason: String,
    #[serde(default)]
    blocking_question: Option<String>,
    #[serde(default = "default_complexity")]
    estimated_complexity: u8,
    #[serde(default)]
    dependencies: Vec<i64>,
}

fn default_complexity() -> u8 {
    5
}

fn classification_system_prompt() -> &'static str {
    "You are the triage policy for an autonomous coding agent. Given a GitHub \
     issue, respond with ONLY a JSON object: \
     {\"category\": \"SIMPLE\"|\"COMPLEX\"|\"BLOCKED\"|\"SKIP\", \"reason\": string, \
     \"blocking_question\": string|null, \"estimated_complexity\": 1-10, \"dependencies\": [issue numbers]}. \
     SIMPLE issues can be implemented directly in one agent run. COMPLEX issues \
     need to be decomposed into sub-issues first. BLOCKED issues are missing \
     information needed before any implementation can start — set \
     blocking_question. SKIP issues are out of scope for automation (docs-only \
     discussion, duplicates, wontfix)."
}

#[async_trait]
impl Classifier for AnthropicClassifier {
    async fn classify(&self, issue: &IssueDetails, comments: &[String]) -> Classification {
        let user = format!(
            "Title: {}\n\nBody:\n{}\n\nComments:\n{}",
            issue.title,
            issue.body,
            comments.join("\n---\n")
        );
        let raw = match self.call(classification_system_prompt(), &user).await {
            Ok(text) => text,
            Err(err) => return Classification::api_error(err),
        };
        match serde_json::from_str::<RawClassification>(extract_json(&raw)) {
            Ok(parsed) => match ClassificationCategory::parse(&parsed.category) {
                Some(category) => Classification {
                    category,
                    reason: parsed.reason,
                    blocking_question: parsed.blocking_question,
                    estimated_complexity: parsed.estimated_complexity,
                    dependencies: parsed.dependencies,
                },
                None => Classification::parse_error(),
            },
            Err(_) => Classification::parse_error(),
        }
    }
}

/// Models occasionally wrap JSON in a code fence despite instructions;
/// strip one if present rather than failing the whole classification.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.strip_suffix("```").unwrap_or(s).trim())
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_code_fence() {
        let fenced = "```json\n{\"category\":\"SIMPLE\"}\n```";
        assert_eq!(extract_json(fenced), "{\"category\":\"SIMPLE\"}");
    }

    #[test]
    fn extract_json_passes_through_bare_json() {
        let bare = "{\"category\":\"SIMPLE\"}";
        assert_eq!(extract_json(bare), bare);
    }

    #[test]
    fn raw_classification_parses_minimal_payload() {
        let payload = r#"{"category":"COMPLEX","reason":"needs breakdown"}"#;
        let parsed: RawClassification = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.category, "COMPLEX");
        assert_eq!(parsed.estimated_complexity, default_complexity());
        assert!(parsed.dependencies.is_empty());
    }

    #[test]
    fn malformed_category_degrades_to_parse_error_default() {
        let unparsed = ClassificationCategory::parse("MAYBE");
        assert!(unparsed.is_none());
        let fallback = Classification::parse_error();
        assert_eq!(fallback.category, ClassificationCategory::Simple);
    }
}
