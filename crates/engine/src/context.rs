// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dependency graph every scheduler handler and control-loop phase is
//! built once and threaded through. No `get_*()` singleton accessors.

use std::sync::Arc;

use oj_adapters::{ComputeBackend, IssueTrackerClient};
use oj_core::{Clock, EventBus, SystemClock};
use oj_storage::Store;

use crate::classifier::Classifier;
use crate::config::Config;

/// Everything a handler needs: the store, the event bus, the two external
/// seams, the classifier policy, a clock, and the resolved configuration.
/// Cloning an `AppContext` is cheap — every field is an `Arc` (or the
/// store/config, themselves cheap to clone).
#[derive(Clone)]
pub struct AppContext<C: Clock = SystemClock> {
    pub store: Arc<Store>,
    pub bus: Arc<EventBus>,
    pub tracker: Arc<dyn IssueTrackerClient>,
    pub compute: Arc<dyn ComputeBackend>,
    pub classifier: Arc<dyn Classifier>,
    pub clock: C,
    pub config: Arc<Config>,
}

impl<C: Clock> AppContext<C> {
    pub fn new(
        store: Arc<Store>,
        bus: Arc<EventBus>,
        tracker: Arc<dyn IssueTrackerClient>,
        compute: Arc<dyn ComputeBackend>,
        classifier: Arc<dyn Classifier>,
        clock: C,
        config: Arc<Config>,
    ) -> Self {
        Self { store, bus, tracker, compute, classifier, clock, config }
    }
}
