//! gotohome-billing server entry point.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use gotohome_billing::adapters::events::{
    BackgroundEventPublisher, BackgroundPublisherConfig, HandlerRegistry,
};
use gotohome_billing::adapters::http::{app_router, BillingAppState, HttpSettings};
use gotohome_billing::adapters::postgres::{
    PostgresEntitlementRepository, PostgresOrderRepository,
};
use gotohome_billing::adapters::telegram::{TelegramConfig, TelegramNotifier};
use gotohome_billing::config::{AppConfig, DatabaseConfig, ServerConfig};
use gotohome_billing::domain::billing::{
    CallbackVerifier, MerchantProfile, PaymentRequestBuilder, PlanCatalog, ReturnOriginPolicy,
    SigningKey, ENTITLEMENT_GRANTED,
};
use gotohome_billing::ports::EventSubscriber;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let pool = connect(&config.database).await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }

    let catalog = Arc::new(PlanCatalog::bundled()?);
    tracing::info!(
        version = catalog.version(),
        plans = catalog.plans().len(),
        "plan catalog loaded"
    );

    let payment = &config.payment;
    let signing_key = SigningKey::new(payment.secret_key.expose_secret().as_str())?;
    let return_policy = ReturnOriginPolicy::new(
        payment.return_hosts_list(),
        payment.return_host_suffixes_list(),
        payment.fallback_origin.as_str(),
    )?;
    let merchant = MerchantProfile {
        account: payment.merchant_account.clone(),
        domain: payment.merchant_domain.clone(),
        service_url: payment.service_url.clone(),
        return_url: Url::parse(&payment.return_url)?,
        language: payment.language.clone(),
    };
    let payment_builder = PaymentRequestBuilder::new(
        merchant,
        signing_key.clone(),
        catalog.clone(),
        return_policy.clone(),
    )?;
    let callback_verifier = CallbackVerifier::new(
        payment.merchant_account.as_str(),
        signing_key,
        catalog,
        payment.require_callback_signature,
    )?;
    if !payment.require_callback_signature {
        tracing::warn!("callbacks without merchantSignature will be accepted");
    }

    let registry = Arc::new(HandlerRegistry::new());
    match config.notification.telegram() {
        Some((token, chat_id)) => {
            let telegram = TelegramConfig::new(token, chat_id)
                .with_timeout(config.notification.telegram_timeout());
            registry.subscribe(ENTITLEMENT_GRANTED, Arc::new(TelegramNotifier::new(telegram)?));
            tracing::info!("telegram notices enabled");
        }
        None => tracing::info!("telegram notices disabled"),
    }
    let (event_publisher, worker) = BackgroundEventPublisher::new(
        BackgroundPublisherConfig::default()
            .with_queue_capacity(config.notification.queue_capacity),
        registry,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task = tokio::spawn(worker.run(shutdown_rx));

    let state = BillingAppState {
        payment_builder: Arc::new(payment_builder),
        callback_verifier: Arc::new(callback_verifier),
        return_policy: Arc::new(return_policy),
        entitlements: Arc::new(PostgresEntitlementRepository::new(pool.clone())),
        orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
        event_publisher: Arc::new(event_publisher),
    };
    let settings = HttpSettings {
        request_timeout: config.server.request_timeout(),
        cors_origins: config.server.cors_origins_list(),
    };
    let app = app_router(state, &settings);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(Duration::from_secs(5), worker_task)
        .await
        .is_err()
    {
        tracing::warn!("notification worker did not drain in time");
    }
    pool.close().await;
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn connect(database: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(database.idle_timeout())
        .max_lifetime(database.max_lifetime())
        .connect(&database.url)
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
