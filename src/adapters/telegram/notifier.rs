//! Telegram channel notices for new paid subscriptions.
//!
//! Subscribed to `subscription.entitlement_granted.v1` on the background
//! dispatcher. Failures are returned to the worker, which logs them; the
//! payment path never waits on Telegram.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::adapters::html::escape_html;
use crate::domain::billing::BillingEvent;
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventHandler;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram bot credentials and target chat.
#[derive(Clone)]
pub struct TelegramConfig {
    bot_token: SecretString,
    chat_id: String,
    api_base_url: String,
    timeout: Duration,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: SecretString::new(bot_token.into()),
            chat_id: chat_id.into(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Points the notifier at another API host (tests, proxies).
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    config: TelegramConfig,
    http_client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, DomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::NotificationError,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;
        Ok(Self {
            config,
            http_client,
        })
    }

    async fn send(&self, text: &str) -> Result<(), DomainError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base_url,
            self.config.bot_token.expose_secret()
        );
        let body = SendMessage {
            chat_id: &self.config.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| notification_error(format!("Telegram request failed: {}", e.without_url())))?;

        let status = response.status();
        let parsed: TelegramResponse = response
            .json()
            .await
            .map_err(|e| notification_error(format!("Failed to parse Telegram response: {}", e)))?;

        if !parsed.ok {
            return Err(notification_error(format!(
                "Telegram API error ({}): {}",
                status,
                parsed.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

fn notification_error(message: String) -> DomainError {
    DomainError::new(ErrorCode::NotificationError, message)
}

/// Renders the channel notice for a granted entitlement.
///
/// Returns `None` for events that do not warrant a notice.
pub fn format_notice(event: &BillingEvent) -> Option<String> {
    match event {
        BillingEvent::EntitlementGranted {
            product_name,
            price,
            duration_days,
            recurring,
            client_email,
            ..
        } => {
            let period = if *recurring {
                "/ місяць".to_string()
            } else {
                format!("/ {} днів", duration_days)
            };
            let email = client_email.as_deref().unwrap_or("невідомо");
            Some(format!(
                "🌟 Нова PRO підписка на GoToHome!\n\n\
                 📧 Email: {}\n\
                 📋 План: {}\n\
                 💰 Ціна: {} ₴ {}\n\n\
                 🎉 Користувач успішно оформив підписку!",
                escape_html(email),
                escape_html(product_name),
                price,
                period
            ))
        }
        BillingEvent::OrderCreated { .. } => None,
    }
}

#[async_trait]
impl EventHandler for TelegramNotifier {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let billing_event: BillingEvent = event.payload_as().map_err(|e| {
            DomainError::new(
                ErrorCode::NotificationError,
                format!("Unexpected payload for {}: {}", event.event_type, e),
            )
        })?;

        match format_notice(&billing_event) {
            Some(text) => {
                self.send(&text).await?;
                tracing::info!(
                    order_reference = %billing_event.order_reference(),
                    "subscription notice sent to Telegram"
                );
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "TelegramNotifier"
    }
}
