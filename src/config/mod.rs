//! Service configuration, read once at startup.
//!
//! Every setting comes from the process environment (plus an optional `.env`)
//! under the `GOTOHOME` prefix, with `__` between section and key:
//! `GOTOHOME__PAYMENT__SECRET_KEY`, `GOTOHOME__SERVER__PORT`.
//!
//! ```no_run
//! use gotohome_billing::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod database;
mod error;
mod notification;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use notification::NotificationConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// All sections; `database` and `payment` have required keys.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub payment: PaymentConfig,
    /// Telegram notices and the dispatch queue.
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl AppConfig {
    /// Reads `.env` if present, then the `GOTOHOME__*` environment.
    ///
    /// Fails only when a value cannot be deserialized; missing secrets are
    /// caught by [`AppConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let source = config::Environment::default()
            .prefix("GOTOHOME")
            .separator("__");
        let loaded = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        Ok(loaded)
    }

    /// Checks every section; the first failure aborts startup.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate(self.is_production())?;
        self.notification.validate()
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Environment variables are process-wide.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "GOTOHOME__DATABASE__URL",
        "GOTOHOME__PAYMENT__MERCHANT_ACCOUNT",
        "GOTOHOME__PAYMENT__SECRET_KEY",
        "GOTOHOME__PAYMENT__SERVICE_URL",
        "GOTOHOME__PAYMENT__RETURN_URL",
        "GOTOHOME__PAYMENT__REQUIRE_CALLBACK_SIGNATURE",
        "GOTOHOME__SERVER__PORT",
        "GOTOHOME__SERVER__ENVIRONMENT",
        "GOTOHOME__NOTIFICATION__TELEGRAM_BOT_TOKEN",
    ];

    fn set_minimal_env() {
        env::set_var("GOTOHOME__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("GOTOHOME__PAYMENT__MERCHANT_ACCOUNT", "gotohome_com_ua");
        env::set_var("GOTOHOME__PAYMENT__SECRET_KEY", "test-secret");
        env::set_var(
            "GOTOHOME__PAYMENT__SERVICE_URL",
            "https://api.gotohome.com.ua/api/payments/callback",
        );
        env::set_var(
            "GOTOHOME__PAYMENT__RETURN_URL",
            "https://api.gotohome.com.ua/api/payments/return",
        );
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.payment.merchant_account, "gotohome_com_ua");
        assert_eq!(config.payment.secret_key.expose_secret(), "test-secret");
        assert!(config.payment.require_callback_signature);
        assert!(config.notification.telegram().is_none());
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("GOTOHOME__PAYMENT__SECRET_KEY");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("GOTOHOME__PAYMENT__SECRET_KEY"))
        );
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("GOTOHOME__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_signature_requirement_can_be_relaxed() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("GOTOHOME__PAYMENT__REQUIRE_CALLBACK_SIGNATURE", "false");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(!config.payment.require_callback_signature);
    }

    #[test]
    fn test_half_configured_telegram_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("GOTOHOME__NOTIFICATION__TELEGRAM_BOT_TOKEN", "123:abc");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::IncompleteTelegramConfig)
        );
    }
}
