//! Strata API server binary.
//!
//! Validates configuration (failing fast on missing production secrets),
//! connects the pool, runs migrations, starts the rate-limiter sweep task,
//! and serves the auth API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use strata_api::config::ApiConfig;
use strata_core::auth::store::postgres::PgStore;

/// Interval between rate-limiter sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "strata_api_server", about = "Strata API server")]
struct Args {
    /// Address to bind (overrides BIND_ADDR).
    #[arg(long)]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,strata_api=debug,strata_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    // Secrets are validated here; a misconfigured production environment
    // refuses to boot instead of failing on the first request.
    let mut config = ApiConfig::from_env()?;
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    info!(
        bind_addr = %config.bind_addr,
        production = config.auth.production,
        api_keys_enabled = config.auth.api_keys_enabled(),
        "starting strata_api_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    strata_api::migrate(&pool).await?;

    let state = strata_api::AppState::new(Arc::new(PgStore::new(pool)), config.clone());

    // Periodic eviction of expired rate-limit entries bounds memory.
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.sweep();
        }
    });

    let app = strata_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
