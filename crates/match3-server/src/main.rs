//! Match3 game and suggestion server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod protocol;
mod server;
mod session;
mod suggest;

use config::ServerConfig;
use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    info!(
        tick_ms = config.tick.as_millis() as u64,
        levels = config.game.levels.len(),
        suggestions = config.suggestion_url.as_deref().unwrap_or("local"),
        "Starting match3 server..."
    );

    let state = Arc::new(ServerState::new(config));

    server::run_server(state).await
}
