//! # Huddle Server
//!
//! Horizontally scalable presence and messaging server.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! huddle
//!
//! # Run with a config file at ./huddle.toml
//! huddle
//!
//! # Run with environment variables
//! HUDDLE_PORT=4000 HUDDLE_FANOUT_URL=redis://redis:6379 huddle
//! ```

use anyhow::Result;
use huddle_core::NoopHooks;
use huddle_server::{config::Config, handlers, metrics};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;

    tracing::info!("Starting Huddle server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server with the identity hook strategy; embedders swap in
    // their own SessionHooks via run_server.
    handlers::run_server(config, Arc::new(NoopHooks)).await?;

    Ok(())
}
