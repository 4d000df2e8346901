//! ScoutView demo API
//!
//! Serves two protected routes behind the bearer-token middleware:
//!
//! - `GET /api/me` - the caller's identity
//! - `GET /api/admin/ping` - requires the `admin` role
//!
//! `GET /health` stays public. Settings come from the environment
//! (`KEYCLOAK_URL`, `KEYCLOAK_REALM`, `KEYCLOAK_CLIENT_ID`, `AUTH_DISABLED`)
//! or from a config file given with `--config`.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use clap::Parser;
use scoutview_auth::tower::AuthLayer;
use scoutview_auth::{ADMIN_ROLE, AuthGate, AuthSettings, Identity};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// ScoutView demo API server
#[derive(Parser, Debug)]
#[command(name = "scoutview-demo", version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "SCOUTVIEW_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Optional TOML/YAML/JSON settings file; environment variables override it
    #[arg(long, env = "SCOUTVIEW_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => AuthSettings::from_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => AuthSettings::from_env().context("failed to load settings from environment")?,
    };
    let gate = AuthGate::new(&settings).context("failed to build authentication gate")?;

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;

    info!(
        bind = %cli.bind,
        realm = %settings.keycloak_realm,
        auth_disabled = settings.auth_disabled,
        "ScoutView demo listening"
    );

    axum::serve(listener, app(gate))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

/// Build the router with every `/api` route behind the auth middleware
fn app(gate: AuthGate) -> Router {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/admin/ping", get(admin_ping))
        .layer(AuthLayer::new(gate))
        .route("/health", get(health))
}

async fn me(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

async fn admin_ping(
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !identity.has_role(ADMIN_ROLE) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "Insufficient permissions"})),
        ));
    }
    Ok(Json(json!({"pong": true, "user": identity.username()})))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
