// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between the admin CLI (`oj`) and the daemon (`ojd`).
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload, one
//! [`Request`] per connection answered by exactly one [`Response`].

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod wire;

pub use request::{ExecutionListFilter, Request};
pub use response::{BudgetStatusSummary, ExecutionSummary, IssueStateSummary, NudgeSummary, Response, StatusSummary};
pub use wire::{read_message, write_message, ProtocolError};

#[cfg(test)]
mod wire_tests;

#[cfg(test)]
mod property_tests;
