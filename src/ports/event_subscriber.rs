//! EventSubscriber port - Routing of published events to handlers.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Downstream consumer of billing events.
///
/// Delivery is best-effort and may repeat: a redelivered approval produces a
/// second `EntitlementGranted`. A failing handler never affects the request
/// that produced the event, nor the other handlers.
///
/// # Example
///
/// ```ignore
/// #[async_trait]
/// impl EventHandler for ChannelNotifier {
///     async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
///         let granted: BillingEvent = event.payload_as()?;
///         // Post to the channel...
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "ChannelNotifier"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Registers handlers by event type (e.g. `subscription.entitlement_granted.v1`).
pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);
}
