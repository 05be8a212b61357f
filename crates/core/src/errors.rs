//! Error types

use thiserror::Error;

/// Upstream source errors. Adapters recover from these locally.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request to {source_name} failed: {message}")]
    Transport { source_name: String, message: String },

    #[error("Request to {source_name} timed out")]
    Timeout { source_name: String },

    #[error("{source_name} returned HTTP {status}: {body}")]
    Status {
        source_name: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {source_name} response: {message}")]
    Decode { source_name: String, message: String },
}

/// Cache store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Orchestration errors that reach the delivery surfaces
#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias
pub type SourceResult<T> = Result<T, SourceError>;
pub type CacheResult<T> = Result<T, CacheError>;
pub type AggregatorResult<T> = Result<T, AggregatorError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
