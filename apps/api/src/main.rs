//! # DukaSmart API Server
//!
//! ## Usage
//! ```bash
//! # Defaults: 127.0.0.1:3000, database in the platform data directory
//! cargo run -p duka-api
//!
//! # Override via environment
//! DUKA_BIND_ADDR=0.0.0.0:8080 DUKA_DATABASE_PATH=./duka.db cargo run -p duka-api
//! ```
//!
//! With an empty database, the first `POST /api/auth/register` creates the
//! admin account.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use duka_api::config::DEFAULT_LOG_FILTER;
use duka_api::{app, session, AppConfig, AppState};
use duka_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration first: it decides the log format.
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(config.log_json);

    info!("Starting DukaSmart API server...");
    info!(
        bind = %config.bind_addr,
        database = %config.database_path.display(),
        self_registration = config.allow_self_registration,
        "Configuration loaded"
    );

    if let Some(dir) = config.database_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;
    }

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await
    .context("opening database")?;
    info!("Database ready");

    let store = session::store(&db).await.context("preparing session store")?;
    let sweep = session::spawn_expired_sweep(store.clone());

    let addr = config.socket_addr()?;
    let state = AppState::new(db.clone(), config);
    let router = app(state, store);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    sweep.abort();
    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// `RUST_LOG` if set, else [`DEFAULT_LOG_FILTER`].
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
