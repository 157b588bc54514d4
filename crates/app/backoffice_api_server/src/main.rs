//! Backoffice API server binary.
//!
//! Reads configuration from flags, the environment and `.env`, runs
//! migrations, then serves the API until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use backoffice_api::config::{ApiConfig, CalendarConfig, Environment};
use backoffice_core::store::PgStore;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,backoffice_api=debug,backoffice_core=debug";
const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "backoffice_api_server", about = "Backoffice API server")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 10000)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/backoffice"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// HS256 secret for access tokens.
    #[arg(long, env = "JWT_ACCESS_SECRET", hide_env_values = true)]
    jwt_access_secret: String,

    /// HS256 secret for refresh tokens; must differ from the access secret.
    #[arg(long, env = "JWT_REFRESH_SECRET", hide_env_values = true)]
    jwt_refresh_secret: String,

    /// Cookie domain; blank for host-only cookies.
    #[arg(long, env = "COOKIE_DOMAIN", default_value = "")]
    cookie_domain: String,

    /// Comma-separated list of allowed browser origins.
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    cors_origin: String,

    /// Reverse proxies in front of the server whose `x-forwarded-for`
    /// entries are trusted for login rate limiting.
    #[arg(long, env = "TRUST_PROXY_HOPS", default_value_t = 0)]
    trust_proxy_hops: usize,

    /// development, test or production.
    #[arg(long, env = "APP_ENV", default_value = "development")]
    app_env: Environment,

    /// Base URL of the core service for calendar sync; blank disables it.
    #[arg(long, env = "CORE_API_BASE_URL", default_value = "")]
    core_api_base_url: String,

    #[arg(long, env = "CORE_INTERNAL_TOKEN", default_value = "", hide_env_values = true)]
    core_internal_token: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: format!("0.0.0.0:{}", args.port),
        environment: args.app_env,
        jwt_access_secret: args.jwt_access_secret,
        jwt_refresh_secret: args.jwt_refresh_secret,
        cookie_domain: ApiConfig::parse_cookie_domain(&args.cookie_domain),
        cors_origins: ApiConfig::parse_origins(&args.cors_origin),
        trusted_proxy_hops: args.trust_proxy_hops,
        calendar: CalendarConfig {
            base_url: ApiConfig::parse_base_url(&args.core_api_base_url)?,
            internal_token: args.core_internal_token,
        },
    };
    config.validate()?;

    info!(
        environment = %config.environment,
        max_connections = args.max_connections,
        trusted_proxy_hops = config.trusted_proxy_hops,
        "starting backoffice_api_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    backoffice_core::migrate::migrate(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let state = backoffice_api::AppState::with_store(config.clone(), store)?;

    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.prune();
        }
    });

    let app = backoffice_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
