// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt construction for each [`oj_core::ExecutionMode`]. Prompt wording
//! quality is out of scope (see SPEC_FULL's Non-goals); these builders
//! only guarantee the structural contract other modules rely on — e.g.
//! that a human's clarifying reply appears verbatim under a
//! "clarification" heading (scenario S3).

use oj_core::Checkpoint;

pub(crate) fn checkpoint_section(checkpoint: Option<&Checkpoint>) -> String {
    let Some(checkpoint) = checkpoint else {
        return String::new();
    };
    let mut section = String::from("\n\n## Prior attempt\n");
    if let Some(summary) = checkpoint.context_summary() {
        section.push_str(&format!("Context: {summary}\n"));
    }
    if let Some(decisions) = checkpoint.decisions_made() {
        section.push_str(&format!("Decisions made: {decisions}\n"));
    }
    section
}

/// Like [`checkpoint_section`] but shows the issue's full checkpoint
/// history rather than just the latest — for the review/retry/fix-ci
/// prompts, where an agent benefits from seeing every attempt it's
/// already made on this issue, not only the most recent one.
/// `checkpoints` is expected newest-first, the order
/// `Store::get_all_checkpoints` returns.
pub(crate) fn checkpoint_history_section(checkpoints: &[Checkpoint]) -> String {
    if checkpoints.is_empty() {
        return String::new();
    }
    let mut section = String::from("\n\n## Prior attempts\n");
    let total = checkpoints.len();
    for (i, checkpoint) in checkpoints.iter().enumerate() {
        section.push_str(&format!("### Attempt {}\n", total - i));
        if let Some(summary) = checkpoint.context_summary() {
            section.push_str(&format!("Context: {summary}\n"));
        }
        if let Some(decisions) = checkpoint.decisions_made() {
            section.push_str(&format!("Decisions made: {decisions}\n"));
        }
    }
    section
}

pub fn implement_prompt(issue_number: i64, title: &str, body: &str, checkpoint: Option<&Checkpoint>) -> String {
    format!(
        "Implement issue #{issue_number}: {title}\n\n{body}{}",
        checkpoint_section(checkpoint)
    )
}

/// `clarification` carries the human reply verbatim (scenario S3).
pub fn unblocked_prompt(issue_number: i64, title: &str, body: &str, clarification: &str, checkpoint: Option<&Checkpoint>) -> String {
    format!(
        "Implement issue #{issue_number}: {title}\n\n{body}\n\n## Clarification\n{clarification}{}",
        checkpoint_section(checkpoint)
    )
}

pub fn plan_prompt(issue_number: i64, title: &str, body: &str) -> String {
    format!(
        "Plan issue #{issue_number}: {title}\n\n{body}\n\n\
         Read the repository, then create up to 10 sub-issues covering this work. \
         Label each sub-issue `ag/sub-issue`, and additionally `ag/waiting` if it \
         declares a dependency on another sub-issue that is still open. Post a plan \
         summary comment on this issue when done."
    )
}

pub fn address_review_prompt(issue_number: i64, pr_number: i64, review_body: &str, checkpoint: Option<&Checkpoint>) -> String {
    format!(
        "Address review feedback on PR #{pr_number} for issue #{issue_number}.\n\n## Review\n{review_body}{}",
        checkpoint_section(checkpoint)
    )
}

pub fn retry_with_feedback_prompt(issue_number: i64, feedback: &str, checkpoint: Option<&Checkpoint>) -> String {
    format!(
        "Retry issue #{issue_number}. The previous pull request was closed without \
         merging.\n\n## Feedback\n{feedback}{}",
        checkpoint_section(checkpoint)
    )
}

pub fn fix_ci_prompt(issue_number: i64, branch: &str, check_name: &str, check_output: &str, checkpoint: Option<&Checkpoint>) -> String {
    format!(
        "Fix the failing check `{check_name}` on branch `{branch}` for issue \
         #{issue_number}.\n\n## Check output\n{check_output}{}",
        checkpoint_section(checkpoint)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_core::ExecutionId;

    #[test]
    fn implement_prompt_includes_issue_number_and_title() {
        let prompt = implement_prompt(42, "Add dark mode", "Users want a toggle.", None);
        assert!(prompt.contains("#42"));
        assert!(prompt.contains("Add dark mode"));
        assert!(prompt.contains("Users want a toggle."));
    }

    #[test]
    fn unblocked_prompt_carries_clarification_verbatim() {
        let prompt = unblocked_prompt(7, "Flaky test", "body", "use postgres for the fixture", None);
        assert!(prompt.contains("## Clarification"));
        assert!(prompt.contains("use postgres for the fixture"));
    }

    #[test]
    fn checkpoint_section_included_when_present() {
        let checkpoint = Checkpoint::new("7", ExecutionId::new(), serde_json::json!({"context_summary": "wired client"}));
        let prompt = implement_prompt(7, "title", "body", Some(&checkpoint));
        assert!(prompt.contains("wired client"));
    }

    #[test]
    fn plan_prompt_mentions_sub_issue_cap() {
        let prompt = plan_prompt(1, "Epic", "body");
        assert!(prompt.contains("up to 10"));
    }

    #[test]
    fn checkpoint_history_section_empty_when_no_checkpoints() {
        assert_eq!(checkpoint_history_section(&[]), "");
    }

    #[test]
    fn checkpoint_history_section_numbers_attempts_oldest_first() {
        let newest = Checkpoint::new("7", ExecutionId::new(), serde_json::json!({"context_summary": "second pass"}));
        let oldest = Checkpoint::new("7", ExecutionId::new(), serde_json::json!({"context_summary": "first pass"}));
        let section = checkpoint_history_section(&[newest, oldest]);
        let first_idx = section.find("Attempt 1").unwrap();
        let second_idx = section.find("Attempt 2").unwrap();
        assert!(first_idx > second_idx);
        assert!(section.contains("first pass"));
        assert!(section.contains("second pass"));
    }
}
