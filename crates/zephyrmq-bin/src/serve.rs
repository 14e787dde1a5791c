use std::sync::Arc;

use anyhow::anyhow;
use zephyrmq::{
    api::{router, AppState},
    implementations::postgres::{connect_pool, PostgresDriver},
    service::{SharedClock, SystemClock},
    CONFIG,
};

/// Builds the Postgres-backed driver and serves `/v1/...` + `/health` until
/// the process receives a shutdown signal.
pub(crate) async fn serve(bind_addr: std::net::SocketAddr) -> Result<(), anyhow::Error> {
    let pool = connect_pool(
        &CONFIG.database_url,
        CONFIG.pg_max_connections,
        std::time::Duration::from_secs(CONFIG.pg_acquire_timeout_seconds),
    )
    .await
    .map_err(|e| anyhow!(e).context("failed to connect to the database"))?;

    let clock: SharedClock = Arc::new(SystemClock);
    let driver = Arc::new(PostgresDriver::new(pool, clock));
    let state = AppState {
        driver: driver.clone(),
        proxy: driver,
    };

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| anyhow!(e).context(format!("failed to bind to address: {bind_addr}")))?;

    tracing::info!("zephyrmq listening on {bind_addr}");

    zephyrmq::axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!(e).context("server loop failed"))?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
