//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified token record produced by every source adapter.
///
/// Serialized field names are the wire contract shared by the REST endpoint,
/// the push channel and the cache.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(rename = "token_address")]
    pub address: String,
    #[serde(rename = "token_name")]
    pub name: String,
    #[serde(rename = "token_ticker")]
    pub ticker: String,
    #[serde(rename = "price_sol")]
    pub price_native: f64,
    #[serde(rename = "market_cap_sol")]
    pub market_cap: f64,
    #[serde(rename = "volume_sol")]
    pub volume_24h: f64,
    #[serde(rename = "liquidity_sol")]
    pub liquidity: f64,
    pub transaction_count: u64,
    #[serde(rename = "price_1hr_change")]
    pub price_change_1h: f64,
    #[serde(rename = "protocol")]
    pub source_protocol: String,
}

impl TokenRecord {
    /// Builds a record with zeroed metrics. The address is stored normalized.
    pub fn new(
        address: impl AsRef<str>,
        name: impl Into<String>,
        ticker: impl Into<String>,
        source_protocol: impl Into<String>,
    ) -> Self {
        Self {
            address: normalize_address(address.as_ref()),
            name: name.into(),
            ticker: ticker.into(),
            source_protocol: source_protocol.into(),
            ..Default::default()
        }
    }

    /// Identity key used for deduplication.
    pub fn key(&self) -> String {
        normalize_address(&self.address)
    }

    /// Storage form: normalized address, non-finite metrics zeroed.
    ///
    /// NaN and infinity serialize as `null`, which does not decode back into `f64`.
    pub fn normalized(mut self) -> Self {
        fn finite_or_zero(value: &mut f64) {
            if !value.is_finite() {
                *value = 0.0;
            }
        }

        self.address = normalize_address(&self.address);
        finite_or_zero(&mut self.price_native);
        finite_or_zero(&mut self.market_cap);
        finite_or_zero(&mut self.volume_24h);
        finite_or_zero(&mut self.liquidity);
        finite_or_zero(&mut self.price_change_1h);
        self
    }

    /// Records without an address cannot be deduplicated and are never merged.
    pub fn is_identifiable(&self) -> bool {
        !self.address.trim().is_empty()
    }

    pub fn with_price(mut self, price_native: f64) -> Self {
        self.price_native = price_native;
        self
    }

    pub fn with_market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = market_cap;
        self
    }

    pub fn with_volume(mut self, volume_24h: f64) -> Self {
        self.volume_24h = volume_24h;
        self
    }

    pub fn with_liquidity(mut self, liquidity: f64) -> Self {
        self.liquidity = liquidity;
        self
    }

    pub fn with_transaction_count(mut self, count: u64) -> Self {
        self.transaction_count = count;
        self
    }

    pub fn with_price_change_1h(mut self, change: f64) -> Self {
        self.price_change_1h = change;
        self
    }

    /// Fills empty strings and zero metrics from `other`, keeping every populated field.
    pub fn fill_missing_from(&mut self, other: &TokenRecord) {
        fn fill_str(dst: &mut String, src: &str) {
            if dst.is_empty() && !src.is_empty() {
                *dst = src.to_string();
            }
        }
        fn fill_f64(dst: &mut f64, src: f64) {
            if *dst == 0.0 {
                *dst = src;
            }
        }

        fill_str(&mut self.name, &other.name);
        fill_str(&mut self.ticker, &other.ticker);
        fill_str(&mut self.source_protocol, &other.source_protocol);
        fill_f64(&mut self.price_native, other.price_native);
        fill_f64(&mut self.market_cap, other.market_cap);
        fill_f64(&mut self.volume_24h, other.volume_24h);
        fill_f64(&mut self.liquidity, other.liquidity);
        fill_f64(&mut self.price_change_1h, other.price_change_1h);
        if self.transaction_count == 0 {
            self.transaction_count = other.transaction_count;
        }
    }
}

impl fmt::Display for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) via {}", self.ticker, self.address, self.source_protocol)
    }
}

/// Lowercases an address for comparison and storage.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}
