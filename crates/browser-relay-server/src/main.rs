//! Browser relay server.
//!
//! Serves two listeners concurrently: the client-facing HTTP API (tool
//! calls, session lifecycle, SSE events) and the executor-facing
//! WebSocket endpoint the browser extension connects to.

use std::net::SocketAddr;

use browser_relay_transport::{RelayState, api_router, executor_router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::RelayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = RelayConfig::from_env();
    let state = RelayState::new(config.request_timeout);

    let api = api_router(state.clone()).layer(TraceLayer::new_for_http());
    let executor = executor_router(state);

    let api_addr = SocketAddr::from(([127, 0, 0, 1], config.http_port));
    let executor_addr = SocketAddr::from(([127, 0, 0, 1], config.ws_port));

    let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
    let executor_listener = tokio::net::TcpListener::bind(executor_addr).await?;

    tracing::info!("HTTP API listening on http://{api_addr}");
    tracing::info!("Executor WebSocket listening on ws://{executor_addr}/ws");

    tokio::try_join!(
        async { axum::serve(api_listener, api).await },
        async { axum::serve(executor_listener, executor).await },
    )?;

    Ok(())
}
