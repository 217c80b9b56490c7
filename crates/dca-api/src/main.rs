//! # dca-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment:
//! `PORT`, `AUTH_TOKEN`, `POLICY_FILE`, `DATABASE_URL`,
//! `DCA_BOOTSTRAP_ADMIN`, `RUST_LOG` and `LOG_FORMAT=json`.

use anyhow::Context;
use dca_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env().map_err(anyhow::Error::msg)?;
    let policy = config
        .load_policy()
        .map_err(anyhow::Error::msg)
        .context("loading workflow policy")?;
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set, bearer secrets are not checked (development mode)");
    }
    tracing::info!(?config, "configuration loaded");

    // Database pool is optional; absent means in-memory only.
    let db_pool = dca_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let mut state = AppState::new(config.clone(), policy)
        .with_db(db_pool)
        .with_metrics(dca_api::middleware::metrics::install_recorder());

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        anyhow::Error::msg(e)
    })?;

    if let Some(admin) = config.bootstrap_admin {
        state
            .bootstrap_admin(admin)
            .await
            .map_err(|e| anyhow::anyhow!("bootstrap admin: {e}"))?;
    }

    let app = dca_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("DCA API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
