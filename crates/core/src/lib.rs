// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Core domain types for the issue-coordinator: executions, issue state,
//! the nudge queue, webhook events, classification results, and the
//! in-process event bus that ties ingestion to the scheduler.

pub mod macros;

pub mod budget;
pub mod checkpoint;
pub mod classification;
pub mod clock;
pub mod effect;
pub mod event;
pub mod event_bus;
pub mod execution;
pub mod id;
pub mod issue_state;
pub mod label;
pub mod nudge;
pub mod webhook;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use budget::{BudgetUsageRecord, TotalBudgetUsage};
pub use checkpoint::Checkpoint;
pub use classification::{Classification, ClassificationCategory};
pub use clock::{Clock, FakeClock, SystemClock};
pub use effect::Effect;
pub use event::{Event, EventKind, PrReviewState, ProcessingDecision};
pub use event_bus::{EventBus, Handler, SubscriptionId};
pub use execution::{Execution, ExecutionId, ExecutionMode, ExecutionStatus};
pub use id::short;
pub use issue_state::{IssueState, IssueStatePatch};
pub use label::{is_handled_label, is_trigger_label, HANDLED_LABELS, TRIGGER_LABELS};
pub use nudge::{NudgeId, NudgeRequest};
pub use webhook::{WebhookEvent, WebhookEventId};
