//! Source adapter contract and shared HTTP plumbing

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use tokenagg_core::{SourceError, SourceResult, TokenRecord, DEFAULT_USER_AGENT};

/// Adapter configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl SourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Base trait for token sources
///
/// Implementors report failures through [`TokenSource::try_fetch`]; callers use
/// [`TokenSource::fetch`], which logs the failure and yields an empty result.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    fn name(&self) -> &str;

    async fn try_fetch(&self, query: &str) -> SourceResult<Vec<TokenRecord>>;

    async fn fetch(&self, query: &str) -> Vec<TokenRecord> {
        match self.try_fetch(query).await {
            Ok(records) => {
                debug!(source = self.name(), query, count = records.len(), "Fetched tokens");
                records
            }
            Err(e) => {
                warn!(source = self.name(), query, "Fetch failed, using empty result: {}", e);
                Vec::new()
            }
        }
    }
}

/// One-GET-per-call JSON client shared by the adapters
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    name: &'static str,
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(name: &'static str, config: SourceConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| SourceError::Transport {
                source_name: name.to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            name,
            client,
            url: config.url,
        })
    }

    /// GET `url?<params>` and decode the body as JSON
    pub async fn get_json<T>(&self, params: &[(&str, &str)]) -> SourceResult<T>
    where
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let response = self
            .client
            .get(&self.url)
            .query(params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                source_name: self.name.to_string(),
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        debug!(
            source = self.name,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream response received"
        );

        serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode {
            source_name: self.name.to_string(),
            message: e.to_string(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout {
                source_name: self.name.to_string(),
            }
        } else {
            SourceError::Transport {
                source_name: self.name.to_string(),
                message: err.to_string(),
            }
        }
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Accepts a number, a numeric string, or null. Non-finite values ("NaN", "inf") read as absent.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|n: &f64| n.is_finite()))
}

/// Accepts a non-negative integer (or float / numeric string), or null
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64))
}
