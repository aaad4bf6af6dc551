//! EventPublisher port - Hand-off of billing events after a state change.
//!
//! Handlers publish only after the change the event describes is stored.
//! How delivery happens (inline, queued to a background worker) is the
//! adapter's business.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Implementations must not block the caller on slow consumers. Queued
/// adapters deliver at most once: an event dropped because the queue is full
/// is reported as `NotificationError`.
///
/// # Example
///
/// ```ignore
/// let envelope = EventEnvelope::from_event(&event)?;
/// publisher.publish(envelope).await?;
/// ```
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;
}
