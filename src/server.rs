//! Operator HTTP endpoint

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::ledger::spawn_expiry_task;
use crate::state::AppState;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve until Ctrl-C/SIGTERM, running the ledger expiry task alongside
pub async fn run(state: AppState, address: SocketAddr) -> Result<(), AnyError> {
    let retention = &state.config.retention;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let expiry = spawn_expiry_task(
        state.ledger.clone(),
        retention.ledger_ttl.as_time_delta(),
        retention.sweep_interval.as_std(),
        state.metrics.clone(),
        shutdown_rx,
    );

    let db = state.db.clone();
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "relaybox server listening");

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let _ = shutdown_tx.send(true);
    if let Err(err) = expiry.await {
        warn!(%err, "Expiry task did not stop cleanly");
    }
    db.persist()?;

    served?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Response {
    match state.db.health_check() {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(err) => {
            error!(%err, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response()
        }
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    let stats = state.stats.clone();
    match tokio::task::spawn_blocking(move || stats.snapshot()).await {
        Ok(Ok(snapshot)) => Json(snapshot).into_response(),
        Ok(Err(err)) => {
            error!(%err, "Failed to compute usage stats");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(err) => {
            error!(%err, "Stats worker panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(%err, "Failed to install SIGTERM handler");
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
    info!("Shutdown signal received");
}
