//! Aggregation engine
//!
//! Features:
//! - Address-keyed merge with primary-source precedence
//! - TTL cache with fail-soft reads and writes
//! - Concurrent source fetches joined before merging

pub mod aggregator;
pub mod cache;
pub mod merge;

pub use aggregator::{cache_key, AggregatorConfig, AggregatorStats, TokenAggregator, CACHE_KEY_PREFIX};
pub use cache::{CacheEntry, CacheStore, MemoryStore, TokenCache};
pub use merge::{merge, MergeEngine, MergeStrategy};
