// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded, in-process, single-consumer broadcast of [`Event`]s.
//!
//! Webhook ingress must never be backpressured by a slow handler — the
//! durable webhook inbox is the backstop — so `publish` never blocks: on a
//! full queue it logs and drops the event.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::{Event, EventKind};

type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// An async handler: `(Event) -> ()`.
pub type Handler = Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>;

/// Opaque token returned by [`EventBus::subscribe`], passed to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    kind: Option<EventKind>,
    handler: Handler,
}

/// Single-producer-many-consumer in-process event bus.
pub struct EventBus {
    capacity: usize,
    tx: mpsc::Sender<Event>,
    rx: Mutex<Option<mpsc::Receiver<Event>>>,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    next_id: AtomicU64,
    consumer: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
}

impl EventBus {
    /// Default bounded capacity when a deployment doesn't override
    /// `event_bus_max_size`.
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            capacity,
            tx,
            rx: Mutex::new(Some(rx)),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
            consumer: Mutex::new(None),
            pending: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register a handler. `kind = None` subscribes to every event.
    pub fn subscribe(&self, kind: Option<EventKind>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.lock().push(Subscription { id, kind, handler });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.lock().retain(|s| s.id != id);
    }

    /// Non-blocking publish. Returns `false` and logs an error if the
    /// queue is full; never blocks the caller.
    pub fn publish(&self, event: Event) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.pending.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::error!(event = %event.log_summary(), "event bus full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Spawn the consumer task. Idempotent: a second call is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut consumer = self.consumer.lock();
        if consumer.is_some() {
            return;
        }
        let Some(mut rx) = self.rx.lock().take() else { return };
        let subscriptions = self.subscriptions.clone();
        let pending = self.pending.clone();
        let in_flight = self.in_flight.clone();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                pending.fetch_sub(1, Ordering::SeqCst);
                let kind = event.kind();
                let matching: Vec<Handler> = subscriptions
                    .lock()
                    .iter()
                    .filter(|s| s.kind.is_none() || s.kind == Some(kind))
                    .map(|s| s.handler.clone())
                    .collect();

                for handler in matching {
                    let event = event.clone();
                    let in_flight = in_flight.clone();
                    in_flight.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        handler(event).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            }
        });
        *consumer = Some(handle);
    }

    /// Cancel the consumer task. In-flight handler tasks are not awaited.
    pub fn stop(&self) {
        if let Some(handle) = self.consumer.lock().take() {
            handle.abort();
        }
    }

    /// Poll until the queue has been drained and every dispatched handler
    /// has returned. Intended for deterministic tests only.
    pub async fn wait_until_empty(&self) {
        loop {
            if self.pending.load(Ordering::SeqCst) == 0 && self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn issue_created() -> Event {
        Event::IssueCreated { issue_id: "1".into(), repo: "acme/widgets".into(), labels: vec![] }
    }

    #[tokio::test]
    async fn dispatches_to_matching_subscriber() {
        let bus = Arc::new(EventBus::new(EventBus::DEFAULT_CAPACITY));
        bus.start();
        let seen = Arc::new(AtomicBool::new(false));
        let seen2 = seen.clone();
        bus.subscribe(
            Some(EventKind::IssueCreated),
            Arc::new(move |_event| {
                let seen = seen2.clone();
                Box::pin(async move {
                    seen.store(true, Ordering::SeqCst);
                })
            }),
        );

        bus.publish(issue_created());
        bus.wait_until_empty().await;
        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn does_not_dispatch_to_non_matching_kind() {
        let bus = Arc::new(EventBus::new(EventBus::DEFAULT_CAPACITY));
        bus.start();
        let seen = Arc::new(AtomicBool::new(false));
        let seen2 = seen.clone();
        bus.subscribe(
            Some(EventKind::AgentFailed),
            Arc::new(move |_event| {
                let seen = seen2.clone();
                Box::pin(async move {
                    seen.store(true, Ordering::SeqCst);
                })
            }),
        );

        bus.publish(issue_created());
        bus.wait_until_empty().await;
        assert!(!seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn drops_events_when_full_without_blocking() {
        let bus = Arc::new(EventBus::new(1));
        // No consumer started: the channel fills after one publish.
        assert!(bus.publish(issue_created()));
        assert!(!bus.publish(issue_created()));
    }

    #[tokio::test]
    async fn unsubscribe_stops_future_dispatch() {
        let bus = Arc::new(EventBus::new(EventBus::DEFAULT_CAPACITY));
        bus.start();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let id = bus.subscribe(
            None,
            Arc::new(move |_event| {
                let count = count2.clone();
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }),
        );
        bus.unsubscribe(id);
        bus.publish(issue_created());
        bus.wait_until_empty().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
