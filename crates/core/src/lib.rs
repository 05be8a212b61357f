//! Core types for the token aggregator
//!
//! This crate provides shared types used across all components:
//! - The unified token record and address normalization
//! - Error taxonomy for sources, cache and orchestration
//! - Service configuration

pub mod types;
pub mod settings;
pub mod errors;

pub use types::*;
pub use settings::*;
pub use errors::*;
