//! LiveSketch event store server.
//!
//! Listens on `LIVESKETCH_ADDR` (default `0.0.0.0:3030`) and serves the
//! event store WebSocket at `/ws`.

use livesketch_server::{AppState, router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livesketch_server=info,tower_http=info".into()),
        )
        .init();

    let addr = match std::env::var("LIVESKETCH_ADDR") {
        Ok(value) => value.parse::<SocketAddr>().unwrap_or_else(|e| {
            warn!("Ignoring LIVESKETCH_ADDR {:?}: {}", value, e);
            default_addr()
        }),
        Err(_) => default_addr(),
    };

    let app = router(Arc::new(AppState::new()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("LiveSketch event store listening on {}", listener.local_addr()?);
    info!("WebSocket endpoint: ws://{}/ws", listener.local_addr()?);

    axum::serve(listener, app).await
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3030))
}
