//! Telegram adapter - channel notices for subscription events.

mod notifier;

pub use notifier::{format_notice, TelegramConfig, TelegramNotifier};
