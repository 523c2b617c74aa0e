//! Web page variant: `GET /weather?city=<name>` renders the current weather.

pub mod page;
pub mod routes;

pub use routes::{create_router, AppState};

use std::net::SocketAddr;

/// Serve the weather page on `addr` until Ctrl+C.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving weather page on http://{}/weather", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
            tracing::info!("Shutting down web server");
        })
        .await?;

    Ok(())
}
