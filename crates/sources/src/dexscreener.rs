//! DexScreener search adapter (primary source)
//!
//! `GET /latest/dex/search?q={query}` returns trading pairs; each pair's base
//! token becomes one record with the full set of market metrics.

use serde::Deserialize;

use tokenagg_core::{SourceResult, TokenRecord};

use crate::source::{lenient_f64, lenient_u64, HttpFetcher, SourceConfig, TokenSource};

pub const SOURCE_NAME: &str = "dexscreener";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    pairs: Option<Vec<RawPair>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawPair {
    dex_id: Option<String>,
    base_token: Option<RawToken>,
    #[serde(deserialize_with = "lenient_f64")]
    price_native: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    market_cap: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    fdv: Option<f64>,
    volume: Option<RawWindows>,
    liquidity: Option<RawLiquidity>,
    txns: Option<RawTxnWindows>,
    price_change: Option<RawWindows>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawToken {
    address: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWindows {
    #[serde(deserialize_with = "lenient_f64")]
    h1: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    h24: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLiquidity {
    #[serde(deserialize_with = "lenient_f64")]
    usd: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    quote: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTxnWindows {
    h24: Option<RawTxns>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTxns {
    #[serde(deserialize_with = "lenient_u64")]
    buys: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    sells: Option<u64>,
}

impl RawPair {
    fn into_record(self) -> TokenRecord {
        let token = self.base_token.unwrap_or_default();

        let market_cap = self.market_cap.or(self.fdv).unwrap_or(0.0);
        let volume = self.volume.and_then(|v| v.h24).unwrap_or(0.0);
        let liquidity = self
            .liquidity
            .and_then(|l| l.quote.or(l.usd))
            .unwrap_or(0.0);
        let txn_count = self
            .txns
            .and_then(|t| t.h24)
            .map(|t| t.buys.unwrap_or(0).saturating_add(t.sells.unwrap_or(0)))
            .unwrap_or(0);
        let change_1h = self.price_change.and_then(|p| p.h1).unwrap_or(0.0);

        TokenRecord::new(
            token.address.unwrap_or_default(),
            token.name.unwrap_or_default(),
            token.symbol.unwrap_or_default(),
            self.dex_id.unwrap_or_default(),
        )
        .with_price(self.price_native.unwrap_or(0.0))
        .with_market_cap(market_cap)
        .with_volume(volume)
        .with_liquidity(liquidity)
        .with_transaction_count(txn_count)
        .with_price_change_1h(change_1h)
    }
}

/// Richer source: populates every metric and the pair's DEX as protocol
pub struct DexScreenerSource {
    http: HttpFetcher,
}

impl DexScreenerSource {
    pub fn new(config: SourceConfig) -> SourceResult<Self> {
        Ok(Self {
            http: HttpFetcher::new(SOURCE_NAME, config)?,
        })
    }
}

#[async_trait::async_trait]
impl TokenSource for DexScreenerSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn try_fetch(&self, query: &str) -> SourceResult<Vec<TokenRecord>> {
        let response: SearchResponse = self.http.get_json(&[("q", query)]).await?;

        Ok(response
            .pairs
            .unwrap_or_default()
            .into_iter()
            .map(RawPair::into_record)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test_support::serve;
    use axum::{extract::Query, http::HeaderMap, routing::get, Json, Router};
    use std::collections::HashMap;

    const FIXTURE: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "solana",
                "dexId": "raydium",
                "pairAddress": "8sLbNZoA1cfnvMJLPfp98ZLAnFSYCFApfJKMbiXNLwxj",
                "baseToken": {
                    "address": "So11111111111111111111111111111111111111112",
                    "name": "Wrapped SOL",
                    "symbol": "SOL"
                },
                "priceNative": "1.0000",
                "priceUsd": "142.50",
                "txns": { "h1": { "buys": 10, "sells": 4 }, "h24": { "buys": 1200, "sells": 800 } },
                "volume": { "h24": 53000.5, "h6": 12000 },
                "priceChange": { "h1": -0.75, "h24": 2.1 },
                "liquidity": { "usd": 9100000, "base": 30000, "quote": 64000.25 },
                "fdv": 70000000,
                "marketCap": 68000000
            },
            {
                "dexId": "orca",
                "baseToken": { "address": "MintAAA", "symbol": "AAA" },
                "priceNative": 0.002,
                "fdv": 1500,
                "liquidity": { "usd": 900 }
            }
        ]
    }"#;

    #[test]
    fn test_maps_full_pair() {
        let response: SearchResponse = serde_json::from_str(FIXTURE).unwrap();
        let records: Vec<_> = response.pairs.unwrap().into_iter().map(RawPair::into_record).collect();

        let sol = &records[0];
        assert_eq!(sol.address, "so11111111111111111111111111111111111111112");
        assert_eq!(sol.name, "Wrapped SOL");
        assert_eq!(sol.ticker, "SOL");
        assert_eq!(sol.price_native, 1.0);
        assert_eq!(sol.market_cap, 68_000_000.0);
        assert_eq!(sol.volume_24h, 53000.5);
        assert_eq!(sol.liquidity, 64000.25);
        assert_eq!(sol.transaction_count, 2000);
        assert_eq!(sol.price_change_1h, -0.75);
        assert_eq!(sol.source_protocol, "raydium");
    }

    #[test]
    fn test_sparse_pair_uses_fallbacks_and_zero_defaults() {
        let response: SearchResponse = serde_json::from_str(FIXTURE).unwrap();
        let record = response.pairs.unwrap().remove(1).into_record();

        assert_eq!(record.name, "");
        assert_eq!(record.price_native, 0.002);
        assert_eq!(record.market_cap, 1500.0);
        assert_eq!(record.liquidity, 900.0);
        assert_eq!(record.volume_24h, 0.0);
        assert_eq!(record.transaction_count, 0);
        assert_eq!(record.price_change_1h, 0.0);
    }

    #[test]
    fn test_non_finite_metrics_map_to_zero() {
        let json = r#"{"pairs": [{
            "dexId": "raydium",
            "baseToken": { "address": "MintNaN", "symbol": "NAN" },
            "priceNative": "NaN",
            "fdv": "inf",
            "volume": { "h24": "-Infinity" },
            "priceChange": { "h1": "nan" },
            "txns": { "h24": { "buys": "Infinity", "sells": 3 } }
        }]}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let records: Vec<_> = response.pairs.unwrap().into_iter().map(RawPair::into_record).collect();

        let record = &records[0];
        assert_eq!(record.price_native, 0.0);
        assert_eq!(record.market_cap, 0.0);
        assert_eq!(record.volume_24h, 0.0);
        assert_eq!(record.price_change_1h, 0.0);
        assert_eq!(record.transaction_count, 3);

        let blob = serde_json::to_string(&records).unwrap();
        assert!(!blob.contains("null"), "{blob}");
        let decoded: Vec<TokenRecord> = serde_json::from_str(&blob).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_null_pairs_is_empty() {
        let response: SearchResponse = serde_json::from_str(r#"{"pairs": null}"#).unwrap();
        assert!(response.pairs.is_none());
    }

    #[tokio::test]
    async fn test_fetch_sends_query_and_browser_user_agent() {
        let router = Router::new().route(
            "/latest/dex/search",
            get(|Query(params): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                let agent = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if params.get("q").map(String::as_str) != Some("BONK") || !agent.starts_with("Mozilla/5.0") {
                    return Json(serde_json::json!({ "pairs": [] }));
                }
                Json(serde_json::from_str::<serde_json::Value>(FIXTURE).unwrap())
            }),
        );
        let base = serve(router).await;
        let source = DexScreenerSource::new(SourceConfig::new(format!("{base}/latest/dex/search"))).unwrap();

        let records = source.fetch("BONK").await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].address, "mintaaa");
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_empty() {
        let source = DexScreenerSource::new(SourceConfig::new("http://127.0.0.1:1/search")).unwrap();

        assert!(source.try_fetch("SOL").await.is_err());
        assert!(source.fetch("SOL").await.is_empty());
    }
}
