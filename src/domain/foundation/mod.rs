//! Primitives shared by the billing domain: user ids, timestamps, the event
//! envelope and the common error shape.

mod errors;
mod events;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::UserId;
pub use timestamp::Timestamp;
