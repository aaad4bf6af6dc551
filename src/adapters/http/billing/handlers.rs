//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::html::escape_html;
use crate::application::handlers::billing::{
    BuildPaymentCommand, BuildPaymentHandler, GetEntitlementHandler, GetEntitlementQuery,
    HandlePaymentCallbackCommand, HandlePaymentCallbackHandler,
};
use crate::domain::billing::{
    BillingError, CallbackVerifier, PaymentRequestBuilder, ReturnOriginPolicy,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{EntitlementRepository, EventPublisher, OrderRepository};

use super::dto::{
    BuildPaymentRequest, BuildPaymentResponse, EntitlementResponse, ErrorResponse,
    HealthResponse, ReturnQuery,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every field is an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub payment_builder: Arc<PaymentRequestBuilder>,
    pub callback_verifier: Arc<CallbackVerifier>,
    pub return_policy: Arc<ReturnOriginPolicy>,
    pub entitlements: Arc<dyn EntitlementRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub event_publisher: Arc<dyn EventPublisher>,
}

impl BillingAppState {
    pub fn build_payment_handler(&self) -> BuildPaymentHandler {
        BuildPaymentHandler::new(
            self.payment_builder.clone(),
            self.orders.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn callback_handler(&self) -> HandlePaymentCallbackHandler {
        HandlePaymentCallbackHandler::new(
            self.callback_verifier.clone(),
            self.entitlements.clone(),
            self.orders.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn get_entitlement_handler(&self) -> GetEntitlementHandler {
        GetEntitlementHandler::new(self.entitlements.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity set by the upstream auth layer in `X-User-Id`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| UserId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments - Build a signed payment request
pub async fn build_payment(
    State(state): State<BillingAppState>,
    Json(request): Json<BuildPaymentRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.build_payment_handler();
    let cmd = BuildPaymentCommand {
        plan_id: request.plan_id,
        user_id: request.user_id,
        user_email: request.user_email,
        return_domain: request.return_domain,
        requested_at: Timestamp::now(),
    };

    let result = handler.handle(cmd).await?;

    let response = BuildPaymentResponse {
        payment_data: result.payment_request,
        order_id: result.order_reference,
        is_recurring: result.is_recurring,
    };

    Ok(Json(response))
}

/// POST /api/payments/callback - Gateway server-to-server notification
///
/// Every outcome except a storage failure is answered 200 with a signed
/// acknowledgment, so the gateway stops redelivering.
pub async fn handle_payment_callback(
    State(state): State<BillingAppState>,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.callback_handler();
    let cmd = HandlePaymentCallbackCommand {
        payload: body.to_vec(),
        received_at: Timestamp::now(),
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(result.acknowledgment))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/entitlement - Current user's effective plan
pub async fn get_entitlement(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.get_entitlement_handler();
    let query = GetEntitlementQuery {
        user_id: user.user_id.to_string(),
        now: Timestamp::now(),
    };

    let view = handler.handle(query).await?;

    Ok(Json(EntitlementResponse::from(view)))
}

/// GET|POST /api/payments/return - Post-payment landing page
///
/// The gateway may open the return URL with POST, so this answers both
/// methods with a page that navigates the browser onward with GET.
pub async fn payment_return(
    State(state): State<BillingAppState>,
    Query(query): Query<ReturnQuery>,
) -> impl IntoResponse {
    let target = state.return_policy.post_payment_target(query.rd.as_deref());
    tracing::debug!(target = %target, "payment return redirect");

    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        render_redirect_page(&target),
    )
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Minimal page that redirects via meta refresh, script and a fallback link.
pub fn render_redirect_page(target: &str) -> String {
    let attribute = escape_html(target);
    let script_literal = serde_json::to_string(target)
        .unwrap_or_else(|_| "\"/\"".to_string())
        .replace("</", "<\\/");

    format!(
        r#"<!doctype html>
<html lang="uk">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <meta http-equiv="refresh" content="0; url={attribute}" />
    <title>Redirecting…</title>
  </head>
  <body>
    <script>
      window.location.replace({script_literal});
    </script>
    <noscript>
      <p><a href="{attribute}">Перейти на сайт</a></p>
    </noscript>
  </body>
</html>"#
    )
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        // Storage details stay in the logs.
        let message = match &self.0 {
            BillingError::Storage(_) | BillingError::Configuration(_) => {
                "Temporary failure, please retry".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse::new(self.0.code(), message);
        (status, Json(body)).into_response()
    }
}
