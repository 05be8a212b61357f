//! Service wiring: sources, cache, aggregator and background tasks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use tokenagg_core::AppConfig;
use tokenagg_engine::{AggregatorConfig, MemoryStore, MergeStrategy, TokenAggregator, TokenCache};
use tokenagg_sources::{DexScreenerSource, JupiterSource, SourceConfig};

use crate::broadcast::TokenBroadcaster;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<TokenAggregator>,
    pub broadcaster: TokenBroadcaster,
    pub default_query: Arc<str>,
    ws_connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(aggregator: Arc<TokenAggregator>, default_query: impl Into<Arc<str>>) -> Self {
        Self {
            aggregator,
            broadcaster: TokenBroadcaster::new(),
            default_query: default_query.into(),
            ws_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ws_connections(&self) -> usize {
        self.ws_connections.load(Ordering::Relaxed)
    }

    pub(crate) fn ws_connected(&self) -> usize {
        self.ws_connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn ws_disconnected(&self) -> usize {
        self.ws_connections.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }
}

/// Owns the application state and its background tasks
pub struct TokenService {
    config: AppConfig,
    state: AppState,
    store: Arc<MemoryStore>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TokenService {
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let source_config = |url: &str| {
            SourceConfig::new(url)
                .with_timeout(config.upstream_timeout())
                .with_user_agent(config.user_agent.clone())
        };

        let primary = DexScreenerSource::new(source_config(&config.dexscreener_url))?;
        let secondary = JupiterSource::new(source_config(&config.jupiter_url))?;
        let store = Arc::new(MemoryStore::new());

        let aggregator = TokenAggregator::new(
            AggregatorConfig {
                cache_ttl: config.cache_ttl(),
                strategy: if config.enrich_merge {
                    MergeStrategy::Enrich
                } else {
                    MergeStrategy::Precedence
                },
            },
            Arc::new(primary),
            Arc::new(secondary),
            TokenCache::new(store.clone()),
        );

        let state = AppState::new(Arc::new(aggregator), config.default_query.as_str());

        Ok(Self {
            config,
            state,
            store,
            handles: Mutex::new(Vec::new()),
        })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Start the broadcaster and the cache sweep
    pub fn start(&self) {
        let mut handles = self.handles.lock();

        handles.push(self.state.broadcaster.spawn(
            Arc::clone(&self.state.aggregator),
            self.config.broadcast_query.clone(),
            self.config.broadcast_interval(),
        ));
        handles.push(spawn_cache_sweep(Arc::clone(&self.store), self.config.cache_cleanup_interval()));

        info!("Background services started");
    }

    /// Stop all background tasks
    pub fn stop(&self) {
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
        info!("Background services stopped");
    }
}

fn spawn_cache_sweep(store: Arc<MemoryStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;

            let removed = store.purge_expired();
            if removed > 0 {
                debug!(removed, "Purged expired cache entries");
            }
        }
    })
}
