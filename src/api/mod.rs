// src/api/mod.rs
// Ingestion / read / subscribe adapters: thin axum handlers around the
// pipeline core.

pub mod http;
pub mod subscribe;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::broker::Broker;
use crate::config::TopicsConfig;
use crate::pipeline::{Aggregator, Broadcaster, ConversationProcessor};

/// Shared state every handler reads from. Cheaply cloneable: every field is
/// an `Arc` or a small value type.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<dyn Broker>,
    pub topics: TopicsConfig,
    pub processor: Arc<ConversationProcessor>,
    pub aggregator: Arc<Aggregator>,
    pub broadcaster: Arc<Broadcaster>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/messages", post(http::ingest_message))
        .route(
            "/conversations/{tenant_id}/{conversation_id}/intelligence",
            get(http::get_intelligence),
        )
        .route(
            "/conversations/{tenant_id}/{conversation_id}/subscribe",
            get(subscribe::subscribe_conversation),
        )
        .route("/healthz", get(http::healthz))
        .route("/readyz", get(http::readyz))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
