//! Delivery surfaces for the token aggregator
//!
//! REST lookups on `/api/tokens`, a push channel on `/ws` fed by a periodic
//! broadcaster, and a `/health` summary.

pub mod broadcast;
pub mod routes;
pub mod server;
pub mod service;

pub use broadcast::{TokenBroadcaster, TOKEN_UPDATE_EVENT};
pub use routes::create_router;
pub use server::{HttpServer, HttpServerConfig};
pub use service::{AppState, TokenService};
