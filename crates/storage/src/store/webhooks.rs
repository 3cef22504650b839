// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw webhook ingress, invariant I2 (idempotent ingress), and the
//! deduplicator's processed/coalesced bookkeeping.

use chrono::{DateTime, Utc};
use oj_core::{WebhookEvent, WebhookEventId};
use sqlx::Row;

use crate::error::StoreResult;

use super::Store;

fn row_to_webhook_event(row: sqlx::postgres::PgRow) -> StoreResult<WebhookEvent> {
    let coalesced_into: Option<String> = row.try_get("coalesced_into")?;
    Ok(WebhookEvent {
        id: WebhookEventId::from_string(row.try_get::<String, _>("id")?),
        delivery_id: row.try_get("delivery_id")?,
        event_type: row.try_get("event_type")?,
        action: row.try_get("action")?,
        repo: row.try_get("repo")?,
        issue_id: row.try_get("issue_id")?,
        payload: row.try_get("payload")?,
        processed: row.try_get("processed")?,
        coalesced_into: coalesced_into.map(WebhookEventId::from_string),
        received_at: row.try_get("received_at")?,
        processed_at: row.try_get("processed_at")?,
    })
}

impl Store {
    /// Returns `false` on a duplicate `delivery_id` (invariant I2) instead
    /// of erroring — ingress absorbs the duplicate and responds success.
    pub async fn create_webhook_event(&self, event: &WebhookEvent) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO webhook_events (id, delivery_id, event_type, action, repo, issue_id, \
             payload, processed, coalesced_into, received_at, processed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (delivery_id) DO NOTHING",
        )
        .bind(event.id.as_str())
        .bind(&event.delivery_id)
        .bind(&event.event_type)
        .bind(&event.action)
        .bind(&event.repo)
        .bind(&event.issue_id)
        .bind(&event.payload)
        .bind(event.processed)
        .bind(event.coalesced_into.as_ref().map(|id| id.as_str().to_string()))
        .bind(event.received_at)
        .bind(event.processed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn get_unprocessed_webhook_events(&self, older_than: DateTime<Utc>, limit: i64) -> StoreResult<Vec<WebhookEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM webhook_events WHERE NOT processed AND received_at <= $1 \
             ORDER BY received_at ASC LIMIT $2",
        )
        .bind(older_than)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_webhook_event).collect()
    }

    pub async fn get_recent_events_for_issue(&self, repo: &str, issue_id: &str, since: DateTime<Utc>) -> StoreResult<Vec<WebhookEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM webhook_events WHERE repo = $1 AND issue_id = $2 AND received_at >= $3 \
             ORDER BY received_at ASC",
        )
        .bind(repo)
        .bind(issue_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_webhook_event).collect()
    }

    /// Mark a whole coalesced group processed in one round-trip, all
    /// pointing `coalesced_into` at the group's primary event.
    pub async fn mark_webhook_events_processed(&self, ids: &[WebhookEventId], coalesced_into: Option<WebhookEventId>) -> StoreResult<()> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        sqlx::query(
            "UPDATE webhook_events SET processed = TRUE, processed_at = now(), \
             coalesced_into = COALESCE($2, coalesced_into) \
             WHERE id = ANY($1)",
        )
        .bind(&ids)
        .bind(coalesced_into.as_ref().map(|id| id.as_str().to_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "webhooks_tests.rs"]
mod tests;
