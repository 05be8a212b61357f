//! Aggregation orchestrator - cache-first reads over two sources

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use tokenagg_core::{AggregatorResult, TokenRecord};
use tokenagg_sources::TokenSource;

use crate::cache::TokenCache;
use crate::merge::{MergeEngine, MergeStrategy};

/// Versioned cache key prefix. Bump when the stored record shape changes.
pub const CACHE_KEY_PREFIX: &str = "tokens:v1";

/// Cache key for a raw (un-normalized) query
pub fn cache_key(query: &str) -> String {
    format!("{}:{}", CACHE_KEY_PREFIX, query)
}

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub cache_ttl: Duration,
    pub strategy: MergeStrategy,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            strategy: MergeStrategy::Precedence,
        }
    }
}

/// Coordinates the two sources, the merge engine and the cache
pub struct TokenAggregator {
    config: AggregatorConfig,
    primary: Arc<dyn TokenSource>,
    secondary: Arc<dyn TokenSource>,
    cache: TokenCache,
    engine: MergeEngine,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    upstream_fetches: AtomicU64,
    started_at: Instant,
}

impl TokenAggregator {
    /// `primary` is the richer source and wins every merge conflict
    pub fn new(
        config: AggregatorConfig,
        primary: Arc<dyn TokenSource>,
        secondary: Arc<dyn TokenSource>,
        cache: TokenCache,
    ) -> Self {
        Self {
            engine: MergeEngine::new(config.strategy),
            config,
            primary,
            secondary,
            cache,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            upstream_fetches: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Merged, deduplicated tokens for `query`
    ///
    /// Source failures yield empty contributions. Only serializing the merged
    /// result for the cache can fail.
    pub async fn get_aggregated_data(&self, query: &str) -> AggregatorResult<Vec<TokenRecord>> {
        let key = cache_key(query);

        if let Some(blob) = self.cache.get(&key).await {
            match serde_json::from_str::<Vec<TokenRecord>>(&blob) {
                Ok(records) => {
                    self.cache_hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(records);
                }
                Err(e) => warn!(key = %key, "Discarding undecodable cache entry: {}", e),
            }
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        let start = Instant::now();
        self.upstream_fetches.fetch_add(2, Ordering::Relaxed);
        let (primary, secondary) = tokio::join!(self.primary.fetch(query), self.secondary.fetch(query));
        let (primary_count, secondary_count) = (primary.len(), secondary.len());

        let merged = self.engine.merge(primary, secondary);
        debug!(
            query,
            primary = primary_count,
            secondary = secondary_count,
            merged = merged.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Merged source results"
        );

        let blob = serde_json::to_string(&merged)?;
        if !self.cache.set(&key, blob, self.config.cache_ttl).await {
            info!(key = %key, "Serving uncached result");
        }

        Ok(merged)
    }

    /// Get statistics
    pub fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            upstream_fetches: self.upstream_fetches.load(Ordering::Relaxed),
            cache_errors: self.cache.error_count(),
            cache_entries: self.cache.entry_count(),
            uptime: self.started_at.elapsed(),
        }
    }
}

/// Aggregator statistics
#[derive(Debug, Clone)]
pub struct AggregatorStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Source calls issued, one per source on every miss
    pub upstream_fetches: u64,
    pub cache_errors: u64,
    pub cache_entries: Option<usize>,
    pub uptime: Duration,
}
