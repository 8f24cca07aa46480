use std::net::SocketAddr;
use std::sync::Arc;

use account_service::config::Config;
use account_service::domain::account::service::AccountService;
use account_service::domain::audit::ports::AuditServicePort;
use account_service::domain::audit::service::AuditService;
use account_service::domain::auth::ports::AuthServicePort;
use account_service::domain::auth::service::AuthService;
use account_service::domain::rate_limit::ports::RateGuardPort;
use account_service::domain::rate_limit::service::RateGuard;
use account_service::inbound::http::router::create_router;
use account_service::inbound::http::router::RouterSettings;
use account_service::outbound::repositories::PostgresAuditLog;
use account_service::outbound::repositories::PostgresCredentialStore;
use account_service::outbound::repositories::PostgresRateLimitLog;
use account_service::outbound::repositories::PostgresSessionStore;
use auth::Authenticator;
use auth::TokenCodec;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        max_connections = config.database.max_connections,
        access_token_minutes = config.jwt.access_token_minutes,
        session_ttl_hours = config.session.ttl_hours,
        lockout_max_attempts = config.lockout.max_attempts,
        trust_forwarded_for = config.server.trust_forwarded_for,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let password_hasher = config.password.hasher()?;
    let authenticator = Arc::new(Authenticator::from_parts(
        password_hasher.clone(),
        TokenCodec::with_lifetimes(config.jwt.secret.as_bytes(), config.jwt.lifetimes()),
    ));

    let credentials = Arc::new(PostgresCredentialStore::new(pg_pool.clone()));
    let sessions = Arc::new(PostgresSessionStore::new(pg_pool.clone()));
    let audit_log = Arc::new(PostgresAuditLog::new(pg_pool.clone()));
    let rate_limit_log = Arc::new(PostgresRateLimitLog::new(pg_pool));

    let auth_service = Arc::new(AuthService::new(
        Arc::clone(&credentials),
        Arc::clone(&sessions),
        Arc::clone(&audit_log),
        authenticator,
        config.lockout.policy(),
        config.session.policy(),
    ));
    let account_service = Arc::new(AccountService::new(
        credentials,
        sessions,
        Arc::clone(&audit_log),
        password_hasher,
        auth_service.activity(),
    ));
    let audit_service = Arc::new(AuditService::new(audit_log));
    let rate_guard = Arc::new(RateGuard::new(rate_limit_log));
    let retention = config.retention.policy();

    let cleanup_sessions = Arc::clone(&auth_service);
    let cleanup_audit = Arc::clone(&audit_service);
    let cleanup_rate_limits = Arc::clone(&rate_guard);
    let cleanup_interval = config.session.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            match cleanup_sessions.cleanup_sessions().await {
                Ok(deleted) => tracing::info!(deleted, "Periodic session cleanup finished"),
                Err(e) => tracing::error!(error = %e, "Periodic session cleanup failed"),
            }
            if let Err(e) = cleanup_audit.prune(retention.audit_log).await {
                tracing::error!(error = %e, "Periodic audit log cleanup failed");
            }
            if let Err(e) = cleanup_rate_limits.prune(retention.rate_limit_log).await {
                tracing::error!(error = %e, "Periodic rate limit log cleanup failed");
            }
        }
    });

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(
        auth_service,
        account_service,
        audit_service,
        rate_guard,
        RouterSettings {
            rate_limits: config.rate_limit.limits(),
            retention,
            forwarded_for: config.server.forwarded_for(),
        },
    );

    axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
