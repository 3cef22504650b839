// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The budget manager: the read side of usage accounting. Recording
//! happens at finalize (`effects::finalize_execution`); this module only
//! sums what's already stored, for the admin status surface.

use oj_core::{Clock, TotalBudgetUsage};

use crate::context::AppContext;
use crate::error::EngineError;

pub async fn get_budget_status<C: Clock>(ctx: &AppContext<C>) -> Result<TotalBudgetUsage, EngineError> {
    Ok(ctx.store.get_total_budget_usage().await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use oj_adapters::test_support::fakes;
    use oj_adapters::{ComputeBackend, IssueDetails, IssueTrackerClient};
    use oj_core::{BudgetUsageRecord, Classification, EventBus, ExecutionId, FakeClock};
    use oj_storage::test_harness::test_store;

    use super::*;
    use crate::classifier::Classifier;
    use crate::config::Config;
    use crate::context::AppContext;

    struct StaticClassifier;

    #[async_trait]
    impl Classifier for StaticClassifier {
        async fn classify(&self, _issue: &IssueDetails, _comments: &[String]) -> Classification {
            Classification::parse_error()
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL_TEST"]
    async fn sums_recorded_usage() {
        let Some(store) = test_store().await else { return };
        let (tracker, compute) = fakes();
        let ctx = AppContext::new(
            Arc::new(store),
            Arc::new(EventBus::new(16)),
            tracker as Arc<dyn IssueTrackerClient>,
            compute as Arc<dyn ComputeBackend>,
            Arc::new(StaticClassifier),
            FakeClock::new(),
            Arc::new(Config::default()),
        );

        ctx.store
            .record_budget_usage(&BudgetUsageRecord {
                execution_id: ExecutionId::new(),
                tokens_used: 100,
                duration_seconds: 30,
                recorded_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        ctx.store
            .record_budget_usage(&BudgetUsageRecord {
                execution_id: ExecutionId::new(),
                tokens_used: 50,
                duration_seconds: 10,
                recorded_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let status = get_budget_status(&ctx).await.unwrap();
        assert_eq!(status.tokens_used, 150);
        assert_eq!(status.duration_seconds, 40);
    }
}
