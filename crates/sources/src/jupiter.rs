//! Jupiter token search adapter (secondary source)

use serde::Deserialize;

use tokenagg_core::{SourceResult, TokenRecord};

use crate::source::{HttpFetcher, SourceConfig, TokenSource};

pub const SOURCE_NAME: &str = "jupiter";

/// Protocol label attached to every Jupiter record
pub const PROTOCOL: &str = "Jupiter";

/// Search results arrive as a bare array; older deployments wrap them in `tokens`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    List(Vec<RawToken>),
    Wrapped {
        #[serde(default)]
        tokens: Vec<RawToken>,
    },
}

impl SearchResponse {
    fn into_tokens(self) -> Vec<RawToken> {
        match self {
            SearchResponse::List(tokens) => tokens,
            SearchResponse::Wrapped { tokens } => tokens,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawToken {
    id: Option<String>,
    address: Option<String>,
    mint: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
}

impl RawToken {
    fn into_record(self) -> TokenRecord {
        let usable = |value: Option<String>| value.filter(|s| !s.trim().is_empty());
        let address = usable(self.id)
            .or_else(|| usable(self.address))
            .or_else(|| usable(self.mint))
            .unwrap_or_default();

        TokenRecord::new(
            address,
            self.name.unwrap_or_default(),
            self.symbol.unwrap_or_default(),
            PROTOCOL,
        )
    }
}

/// Sparser source: identity fields only, metrics stay at zero
pub struct JupiterSource {
    http: HttpFetcher,
}

impl JupiterSource {
    pub fn new(config: SourceConfig) -> SourceResult<Self> {
        Ok(Self {
            http: HttpFetcher::new(SOURCE_NAME, config)?,
        })
    }
}

#[async_trait::async_trait]
impl TokenSource for JupiterSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn try_fetch(&self, query: &str) -> SourceResult<Vec<TokenRecord>> {
        let response: SearchResponse = self.http.get_json(&[("query", query)]).await?;

        Ok(response
            .into_tokens()
            .into_iter()
            .map(RawToken::into_record)
            .collect())
    }
}
