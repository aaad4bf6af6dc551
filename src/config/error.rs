//! Startup configuration failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The environment could not be read into [`super::AppConfig`].
    #[error("cannot load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that the service refuses to start with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Carries the full environment variable name.
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    #[error("server host and port do not form a socket address")]
    InvalidBindAddress,

    #[error("server port must be non-zero")]
    InvalidPort,

    #[error("request timeout must be between 1 and 300 seconds")]
    InvalidTimeout,

    #[error("database url must use the postgres:// or postgresql:// scheme")]
    InvalidDatabaseUrl,

    #[error("database pool bounds are inconsistent")]
    InvalidPoolSize,

    #[error("database pool may not exceed 100 connections")]
    PoolSizeTooLarge,

    #[error("{0} is not a valid URL")]
    InvalidUrl(&'static str),

    #[error("{0} must use https in production")]
    MustBeHttps(&'static str),

    #[error("telegram bot token and chat id must be set together")]
    IncompleteTelegramConfig,

    #[error("notification queue capacity must be positive")]
    InvalidQueueCapacity,
}
