//! Token aggregator - REST and push delivery
//!
//! Main entry point for the HTTP server

use std::env;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tokenagg_core::AppConfig;
use tokenagg_server::{HttpServer, HttpServerConfig, TokenService};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the filter reads RUST_LOG
    dotenvy::dotenv().ok();
    init_logging();

    info!("Starting token aggregator v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!(
        "Cache TTL {:?}, broadcasting '{}' every {:?}",
        config.cache_ttl(),
        config.broadcast_query,
        config.broadcast_interval()
    );

    let server_config = HttpServerConfig {
        host: config.host.clone(),
        port: config.port,
    };

    let service = TokenService::from_config(config)?;
    service.start();

    let server = HttpServer::new(server_config, service.state());

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C");
            }
            _ = terminate => {
                info!("Received termination signal");
            }
        }

        let _ = shutdown_tx.send(());
    });

    info!("Serving on http://{}", server.address());

    let result = server.start_with_shutdown(shutdown_rx).await;
    service.stop();

    if let Err(e) = result {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("Server shutdown complete");
    Ok(())
}
