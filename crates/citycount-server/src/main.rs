//! citycount server
//!
//! - GET /city/:name/temp : current temperature, request counted in Redis
//! - Write pipeline: bounded queue + single background writer
//! - /metrics, /healthz, /readyz

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use citycount_core::error::{CityCountError, Result};
use citycount_server::{app_state::AppState, config, obs::Metrics, router, store::RedisStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(code = e.client_code().as_str(), error = %e, "citycount failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cfg = config::load()?;
    let listen = cfg.server.listen_addr()?;

    let metrics = Arc::new(Metrics::new()?);
    let store = Arc::new(RedisStore::connect(&cfg.store).await?);

    let (state, worker) = AppState::new(cfg, store, metrics)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, "citycount starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| CityCountError::Internal(format!("bind {listen} failed: {e}")))?;

    let drain_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            drain_state.set_draining();
        })
        .await
        .map_err(|e| CityCountError::Internal(format!("server failed: {e}")))?;

    worker.shutdown().await;
    tracing::info!("citycount stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
