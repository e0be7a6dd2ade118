use seiton::{AppState, Backend, Config, router};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    let backend = match &config.data_path {
        Some(path) => Some(Backend::open(path).await?),
        None => {
            warn!("SEITON_DATA_PATH is not set; starting with the backend disabled");
            None
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(environment = ?config.environment, backend = backend.is_some(), "starting seiton");
    let app = router(AppState::new(config, backend));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
