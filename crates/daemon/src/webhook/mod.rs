// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook Inbox & Deduplicator (§4.4): a durable two-stage pipeline —
//! [`ingress`] persists every signed GitHub delivery immediately and
//! answers the request, [`dedup`] walks unprocessed rows after a quiet
//! period, coalesces a `(repo, issue_id)` run of events into a single
//! decision, and publishes at most one [`oj_core::Event`] onto the bus.

pub mod dedup;
pub mod ingress;

pub use dedup::spawn as spawn_deduplicator;
pub use ingress::router;
