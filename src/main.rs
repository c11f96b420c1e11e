use std::net::SocketAddr;

use axum::routing::get;

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    vibecheck::telemetry::setup_subscriber();

    let state = vibecheck::initialize_state().await?;

    let recorder = vibecheck::telemetry::setup_metrics_recorder()?;
    let app = vibecheck::app(state)
        .route("/metrics", get(move || std::future::ready(recorder.render())));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("application shutdown complete");

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
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
