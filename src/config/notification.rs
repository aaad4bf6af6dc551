//! Notification configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Downstream notification configuration (Telegram sales channel)
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Telegram bot token; notices are disabled when unset
    pub telegram_bot_token: Option<String>,

    /// Telegram chat (channel) id receiving notices
    pub telegram_chat_id: Option<String>,

    /// Telegram request timeout in seconds
    #[serde(default = "default_telegram_timeout")]
    pub telegram_timeout_secs: u64,

    /// Events buffered for the dispatch worker before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl NotificationConfig {
    /// Returns `(bot_token, chat_id)` when Telegram notices are enabled.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (self.telegram_bot_token.as_deref(), self.telegram_chat_id.as_deref()) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => {
                Some((token, chat))
            }
            _ => None,
        }
    }

    pub fn telegram_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let token_set = self.telegram_bot_token.as_deref().is_some_and(|t| !t.is_empty());
        let chat_set = self.telegram_chat_id.as_deref().is_some_and(|c| !c.is_empty());
        if token_set != chat_set {
            return Err(ValidationError::IncompleteTelegramConfig);
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_timeout_secs: default_telegram_timeout(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_telegram_timeout() -> u64 {
    10
}

fn default_queue_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let config = NotificationConfig::default();
        assert!(config.telegram().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enabled_with_token_and_chat() {
        let config = NotificationConfig {
            telegram_bot_token: Some("123:abc".to_string()),
            telegram_chat_id: Some("-100200".to_string()),
            ..Default::default()
        };
        assert_eq!(config.telegram(), Some(("123:abc", "-100200")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_without_chat_is_invalid() {
        let config = NotificationConfig {
            telegram_bot_token: Some("123:abc".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::IncompleteTelegramConfig)
        );
    }

    #[test]
    fn test_zero_queue_capacity_is_invalid() {
        let config = NotificationConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidQueueCapacity));
    }
}
