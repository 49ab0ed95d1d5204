// src/main.rs
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use failover_balancer::{
    config::{self, Config},
    proxy::{BackendPool, Proxy},
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("failover_balancer=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(config_path) => {
            info!("Loading configuration from: {}", config_path);
            config::load_config(&config_path).await?
        }
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    // Create backend pool; every backend is probed once here
    let pool = Arc::new(BackendPool::from_config(&config).await?);

    let proxy = Arc::new(Proxy::new(pool));
    let handler = RequestHandler::new(proxy);

    let addr: SocketAddr = ([0, 0, 0, 0], config.listen_port).into();
    info!("Starting load balancer on {}", addr);

    ServerBuilder::new(addr)
        .with_handler(handler)
        .serve()
        .await
}
