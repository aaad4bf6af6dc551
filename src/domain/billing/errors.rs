//! Billing error taxonomy.
//!
//! Every failure on the payment paths falls into one of five classes. The
//! class decides the response: only storage failures ask the gateway to
//! retry; everything else on the callback path is acknowledged.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors raised while building payments or reconciling callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Missing signing secret or merchant identity. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unparseable payload, malformed order reference or unknown plan.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Merchant identity or signature mismatch.
    #[error("Authentication failure: {0}")]
    AuthenticationFailure(String),

    /// Entitlement or order store unavailable.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// A downstream consumer could not be notified.
    #[error("Downstream notification failure: {0}")]
    DownstreamNotification(String),
}

impl BillingError {
    /// Returns true if the caller should redeliver.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Storage(_))
    }

    /// Maps the error to an HTTP status code.
    ///
    /// The callback endpoint only surfaces retryable errors as statuses; the
    /// other classes are answered with a signed acknowledgment.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            BillingError::AuthenticationFailure(_) => StatusCode::UNAUTHORIZED,
            BillingError::DownstreamNotification(_) => StatusCode::BAD_GATEWAY,
            BillingError::Configuration(_) | BillingError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::Configuration(_) => "CONFIGURATION_ERROR",
            BillingError::MalformedRequest(_) => "MALFORMED_REQUEST",
            BillingError::AuthenticationFailure(_) => "AUTHENTICATION_FAILURE",
            BillingError::Storage(_) => "STORAGE_FAILURE",
            BillingError::DownstreamNotification(_) => "NOTIFICATION_FAILURE",
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::MalformedRequest(err.to_string())
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::MalformedRequest(err.message),
            ErrorCode::NotificationError => BillingError::DownstreamNotification(err.message),
            ErrorCode::OrderNotFound | ErrorCode::DatabaseError | ErrorCode::InternalError => {
                BillingError::Storage(err.to_string())
            }
        }
    }
}
