//! BackgroundEventPublisher - fire-and-forget delivery to event handlers.
//!
//! `publish` only enqueues onto a bounded channel; a [`DispatchWorker`] task
//! drains the channel and invokes the subscribed handlers. A slow or failing
//! consumer therefore never delays the request that produced the event.
//!
//! ## Overflow
//!
//! When the queue is full the event is dropped and `publish` returns a
//! `NotificationError`. Callers treat that as best-effort and log it.
//!
//! ## Graceful Shutdown
//!
//! The worker listens on a watch channel. On shutdown it delivers whatever
//! is already queued, then stops.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

use super::registry::HandlerRegistry;

/// Configuration for the background publisher.
#[derive(Debug, Clone)]
pub struct BackgroundPublisherConfig {
    /// Events buffered before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for BackgroundPublisherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

impl BackgroundPublisherConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Enqueuing side, handed to command handlers.
#[derive(Clone)]
pub struct BackgroundEventPublisher {
    sender: mpsc::Sender<EventEnvelope>,
}

impl BackgroundEventPublisher {
    /// Creates the publisher and the worker that must be spawned to drain it.
    pub fn new(
        config: BackgroundPublisherConfig,
        handlers: Arc<HandlerRegistry>,
    ) -> (Self, DispatchWorker) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        (Self { sender }, DispatchWorker { receiver, handlers })
    }
}

#[async_trait]
impl EventPublisher for BackgroundEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.sender.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(dropped) => DomainError::new(
                ErrorCode::NotificationError,
                "notification queue full, event dropped",
            )
            .with_detail("event_type", dropped.event_type)
            .with_detail("event_id", dropped.event_id.as_str()),
            mpsc::error::TrySendError::Closed(dropped) => DomainError::new(
                ErrorCode::NotificationError,
                "notification worker stopped, event dropped",
            )
            .with_detail("event_type", dropped.event_type),
        })
    }
}

/// Draining side. Run with `tokio::spawn(worker.run(shutdown_rx))`.
pub struct DispatchWorker {
    receiver: mpsc::Receiver<EventEnvelope>,
    handlers: Arc<HandlerRegistry>,
}

impl DispatchWorker {
    /// Runs until shutdown is signalled or every publisher is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("notification worker started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.drain().await;
                        break;
                    }
                }
                next = self.receiver.recv() => {
                    match next {
                        Some(event) => {
                            self.dispatch(event).await;
                        }
                        None => break,
                    }
                }
            }
        }
        tracing::info!("notification worker stopped");
    }

    /// Delivers one event to every subscribed handler.
    ///
    /// Returns the number of handlers that failed. Failures are logged and
    /// never retried.
    pub async fn dispatch(&self, event: EventEnvelope) -> usize {
        let mut failures = 0;
        for handler in self.handlers.handlers_for(&event.event_type) {
            if let Err(e) = handler.handle(event.clone()).await {
                failures += 1;
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    event_id = %event.event_id,
                    error = %e,
                    "event handler failed"
                );
            }
        }
        failures
    }

    async fn drain(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            self.dispatch(event).await;
        }
    }
}
