use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth::TokenIssuer;
use identity_service::config::Config;
use identity_service::domain::auth::service::AuthService;
use identity_service::domain::health::service::HealthService;
use identity_service::domain::health::service::KeyValueStoreHealth;
use identity_service::domain::httplog::ports::HttpLogServicePort;
use identity_service::domain::httplog::service::HttpLogService;
use identity_service::domain::report::ports::Mailer;
use identity_service::domain::report::service::DailyReportService;
use identity_service::domain::user::service::UserService;
use identity_service::inbound::http::rate_limit::ClientRateLimiter;
use identity_service::inbound::http::router::create_router;
use identity_service::inbound::http::router::AppState;
use identity_service::inbound::http::router::HttpSettings;
use identity_service::inbound::scheduler::schedule_daily_report;
use identity_service::inbound::scheduler::schedule_http_log_cleanup;
use identity_service::inbound::scheduler::schedule_rate_limit_cleanup;
use identity_service::inbound::scheduler::JobScheduler;
use identity_service::outbound::cache::RedisKeyValueStore;
use identity_service::outbound::mail::SmtpMailer;
use identity_service::outbound::repositories::PostgresHealthIndicator;
use identity_service::outbound::repositories::PostgresHttpLogRepository;
use identity_service::outbound::repositories::PostgresUserRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        environment = %config.server.environment,
        http_port = config.server.http_port,
        access_token_ttl_minutes = config.jwt.access_token_ttl_minutes,
        refresh_token_ttl_hours = config.jwt.refresh_token_ttl_hours,
        report_enabled = config.report.enabled,
        http_log_enabled = config.http_log.enabled,
        rate_limit_enabled = config.rate_limit.enabled,
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

    let key_value_store = Arc::new(RedisKeyValueStore::connect(&config.redis.url).await?);
    tracing::info!(cache = "redis", "Key-value store connected");

    let token_issuer = Arc::new(TokenIssuer::new(
        config.jwt.secret.as_bytes(),
        config.jwt.issuer.clone(),
        config.jwt.access_token_ttl(),
    ));
    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let http_log_repository = Arc::new(PostgresHttpLogRepository::new(pg_pool.clone()));

    let auth_service = Arc::new(AuthService::new(
        Arc::clone(&user_repository),
        Arc::clone(&key_value_store),
        Arc::clone(&token_issuer),
        config.jwt.refresh_token_ttl(),
    ));
    let user_service = Arc::new(UserService::new(
        Arc::clone(&user_repository),
        Arc::clone(&key_value_store),
        config.cache.user_ttl(),
    ));
    let health_service = Arc::new(HealthService::new(
        Arc::new(PostgresHealthIndicator::new(pg_pool.clone())),
        Arc::new(KeyValueStoreHealth::new(Arc::clone(&key_value_store))),
        env!("CARGO_PKG_VERSION"),
    ));
    let http_log_service: Arc<dyn HttpLogServicePort> =
        Arc::new(HttpLogService::new(http_log_repository));
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&config.email)?);
    let rate_limiter = if config.rate_limit.enabled {
        tracing::info!(
            requests_per_minute = config.rate_limit.requests_per_minute,
            burst_size = config.rate_limit.burst_size,
            trust_forwarded_for = config.rate_limit.trust_forwarded_for,
            "Rate limiting enabled"
        );
        Some(Arc::new(ClientRateLimiter::new(&config.rate_limit)?))
    } else {
        None
    };

    let mut scheduler = JobScheduler::new();
    schedule_http_log_cleanup(
        &mut scheduler,
        &config.http_log.cleanup_schedule,
        Arc::clone(&http_log_service),
        config.http_log.retention_days,
    )?;
    if config.report.enabled {
        let report_service = Arc::new(DailyReportService::new(
            Arc::clone(&user_repository),
            Arc::clone(&mailer),
            config.report.recipients.clone(),
        ));
        schedule_daily_report(&mut scheduler, &config.report.schedule, report_service)?;
    }
    if let Some(rate_limiter) = &rate_limiter {
        schedule_rate_limit_cleanup(
            &mut scheduler,
            &config.rate_limit.cleanup_schedule,
            Arc::clone(rate_limiter),
        )?;
    }
    tracing::info!(jobs = ?scheduler.job_names(), "Scheduler started");

    let state = AppState {
        auth_service,
        user_service,
        health_service,
        http_log_service,
        mailer,
        token_issuer,
        rate_limiter,
        settings: HttpSettings {
            cookie_secure: config.server.cookie_secure,
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
            http_log: config.http_log.clone(),
        },
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(state);
    let served = axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    scheduler.stop().await;
    pg_pool.close().await;

    match served {
        Ok(()) => tracing::info!("Server exited successfully"),
        Err(ref e) => tracing::error!(error = %e, "Server error"),
    };

    served.map_err(anyhow::Error::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
