//! Upstream token sources
//!
//! Each adapter wraps one HTTP API and maps its response into [`TokenRecord`]s.
//! Failures never reach the caller of [`TokenSource::fetch`]: they are logged
//! and surface as an empty result.
//!
//! [`TokenRecord`]: tokenagg_core::TokenRecord

pub mod source;
pub mod dexscreener;
pub mod jupiter;

pub use source::{HttpFetcher, SourceConfig, TokenSource};
pub use dexscreener::DexScreenerSource;
pub use jupiter::JupiterSource;
