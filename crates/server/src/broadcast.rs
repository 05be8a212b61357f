//! Periodic token broadcaster for push subscribers

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use tokenagg_core::{AggregatorResult, TokenRecord};
use tokenagg_engine::TokenAggregator;

/// Event name carried by every push frame
pub const TOKEN_UPDATE_EVENT: &str = "tokenUpdate";

const BROADCAST_CAPACITY: usize = 64;

/// Push frame payload
#[derive(Debug, Serialize)]
pub struct TokenUpdate<'a> {
    pub event: &'static str,
    pub query: &'a str,
    pub data: &'a [TokenRecord],
    pub timestamp: DateTime<Utc>,
}

impl<'a> TokenUpdate<'a> {
    pub fn new(query: &'a str, data: &'a [TokenRecord]) -> Self {
        Self {
            event: TOKEN_UPDATE_EVENT,
            query,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Fan-out of serialized frames to all connected subscribers
#[derive(Clone)]
pub struct TokenBroadcaster {
    tx: broadcast::Sender<Arc<str>>,
}

impl TokenBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Aggregate `query` and push one frame; returns the number of receivers
    pub async fn publish(&self, aggregator: &TokenAggregator, query: &str) -> AggregatorResult<usize> {
        let tokens = aggregator.get_aggregated_data(query).await?;
        let frame = serde_json::to_string(&TokenUpdate::new(query, &tokens))?;

        // No subscribers is not an error
        Ok(self.tx.send(Arc::from(frame)).unwrap_or(0))
    }

    /// Publish on a fixed interval until the task is aborted. Failures are
    /// logged and the next tick proceeds.
    pub fn spawn(
        &self,
        aggregator: Arc<TokenAggregator>,
        query: String,
        every: Duration,
    ) -> JoinHandle<()> {
        let broadcaster = self.clone();

        tokio::spawn(async move {
            info!("Broadcasting '{}' every {:?}", query, every);
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match broadcaster.publish(&aggregator, &query).await {
                    Ok(receivers) => debug!(query = %query, receivers, "Broadcast tokens"),
                    Err(e) => warn!(query = %query, "Broadcast failed: {}", e),
                }
            }
        })
    }
}

impl Default for TokenBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
