//! HTTP and WebSocket routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use tokenagg_core::{AggregatorError, TokenRecord};

use crate::service::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/tokens", get(get_tokens))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct TokensQuery {
    pub q: Option<String>,
}

/// Error body returned to clients. Upstream details are never included.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

#[derive(Debug)]
pub enum ApiError {
    Internal(AggregatorError),
}

impl From<AggregatorError> for ApiError {
    fn from(err: AggregatorError) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Internal(e) => {
                error!("Aggregation failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "Internal server error",
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// `GET /api/tokens?q=<query>`; a missing or blank `q` uses the default query
async fn get_tokens(
    State(state): State<AppState>,
    Query(params): Query<TokensQuery>,
) -> Result<Json<Vec<TokenRecord>>, ApiError> {
    let query = match params.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => state.default_query.to_string(),
    };

    let tokens = state.aggregator.get_aggregated_data(&query).await?;
    debug!(query = %query, count = tokens.len(), "Served tokens");
    Ok(Json(tokens))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub upstream_fetches: u64,
    pub cache_errors: u64,
    pub cache_entries: Option<usize>,
    pub ws_connections: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.aggregator.stats();

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: stats.uptime.as_secs(),
        cache_hits: stats.cache_hits,
        cache_misses: stats.cache_misses,
        upstream_fetches: stats.upstream_fetches,
        cache_errors: stats.cache_errors,
        cache_entries: stats.cache_entries,
        ws_connections: state.ws_connections(),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Forward broadcast frames to one subscriber until either side closes
async fn handle_socket(socket: WebSocket, state: AppState) {
    let active = state.ws_connected();
    info!(active, "Push subscriber connected");

    let mut updates = state.broadcaster.subscribe();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.to_string())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Push subscriber lagging, frames dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Ping(payload))) => {
                    if sender.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let active = state.ws_disconnected();
    info!(active, "Push subscriber disconnected");
}
