//! HTTP server configuration and startup

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use crate::routes::create_router;
use crate::service::AppState;

/// Server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// axum server wrapper
pub struct HttpServer {
    config: HttpServerConfig,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind the configured address and serve until `shutdown` fires
    pub async fn start_with_shutdown(
        &self,
        shutdown: tokio::sync::oneshot::Receiver<()>,
    ) -> anyhow::Result<()> {
        let addr: SocketAddr = self.address().parse()?;
        let listener = TcpListener::bind(addr).await?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: tokio::sync::oneshot::Receiver<()>,
    ) -> anyhow::Result<()> {
        info!("HTTP server listening on {}", listener.local_addr()?);

        axum::serve(listener, create_router(self.state.clone()))
            .with_graceful_shutdown(async {
                shutdown.await.ok();
                info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }

    /// Get server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_tungstenite::{connect_async, tungstenite::Message};

    use tokenagg_core::{SourceResult, TokenRecord};
    use tokenagg_engine::{AggregatorConfig, MemoryStore, TokenAggregator, TokenCache};
    use tokenagg_sources::TokenSource;

    struct FixedSource;

    #[async_trait::async_trait]
    impl TokenSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn try_fetch(&self, _query: &str) -> SourceResult<Vec<TokenRecord>> {
            Ok(vec![TokenRecord::new("Mint1", "One", "ONE", "raydium").with_price(0.5)])
        }
    }

    fn state() -> AppState {
        let aggregator = TokenAggregator::new(
            AggregatorConfig::default(),
            Arc::new(FixedSource),
            Arc::new(FixedSource),
            TokenCache::new(Arc::new(MemoryStore::new())),
        );
        AppState::new(Arc::new(aggregator), "SOL")
    }

    #[test]
    fn test_default_config() {
        let config = HttpServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_address() {
        let server = HttpServer::new(
            HttpServerConfig {
                host: "0.0.0.0".into(),
                port: 9000,
            },
            state(),
        );
        assert_eq!(server.address(), "0.0.0.0:9000");
    }

    #[tokio::test]
    async fn test_push_channel_delivers_broadcast() {
        let state = state();
        let server = HttpServer::new(HttpServerConfig::default(), state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let serving = tokio::spawn(async move { server.serve(listener, shutdown_rx).await });

        let (mut socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

        // Wait until the handler has subscribed before publishing
        for _ in 0..100 {
            if state.broadcaster.subscriber_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.ws_connections(), 1);

        let delivered = state.broadcaster.publish(&state.aggregator, "SOL").await.unwrap();
        assert_eq!(delivered, 1);

        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = match frame {
            Message::Text(text) => text,
            other => panic!("expected text frame, got {other:?}"),
        };
        let event: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(event["event"], "tokenUpdate");
        assert_eq!(event["data"][0]["token_address"], "mint1");
        assert_eq!(event["data"][0]["price_sol"], 0.5);

        socket.close(None).await.unwrap();
        shutdown_tx.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }
}
