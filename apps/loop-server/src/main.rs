//! Loop server entry point

mod config;

use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use config::{AppConfig, LoggingConfig};
use loop_service::LoopServiceModule;
use sea_orm::{ConnectOptions, Database};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "loop-server")]
#[command(about = "Serve the transaction loop API")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "LOOP_SERVER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind_addr`
    #[arg(long, env = "LOOP_SERVER_BIND", value_name = "ADDR")]
    bind: Option<String>,

    /// Database URL, overrides `database.url`
    #[arg(long, env = "DATABASE_URL", value_name = "URL")]
    database_url: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    config.logging.json |= cli.json_logs;

    init_tracing(&config.logging);

    let mut options = ConnectOptions::new(config.database.url.clone());
    options
        .max_connections(config.database.max_connections)
        .sqlx_logging(false);
    let db = Arc::new(Database::connect(options).await?);
    tracing::info!("Database connected");

    let module = LoopServiceModule::new();
    module.migrate(&db).await?;
    module.init(db, config.loop_service.clone())?;

    let app = module
        .register_rest(Router::new())?
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!(addr = %config.server.bind_addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }

    tracing::info!("Shutting down gracefully...");
}
