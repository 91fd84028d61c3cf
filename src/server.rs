use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::models::{AliasTable, ModelList};
use crate::proxy::Relay;
use crate::upstream::Upstream;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub relay: Relay,
}

impl AppState {
    /// Build the alias table from `config` and wire it to `upstream`.
    ///
    /// # Errors
    /// Returns `ProxyError::Config` if a configured alias is invalid.
    pub fn new(config: ProxyConfig, upstream: Arc<dyn Upstream>) -> Result<Self> {
        let aliases = AliasTable::with_overrides(&config.models)?;
        let relay = Relay::new(upstream, aliases, config.api_key.clone());
        Ok(Self { config, relay })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root).fallback(handle_not_found))
        .route("/health", get(handle_health).fallback(handle_not_found))
        .route("/v1/models", get(handle_models).fallback(handle_not_found))
        .route(
            "/v1/chat/completions",
            post(handle_chat_completions).fallback(handle_not_found),
        )
        .fallback(handle_not_found)
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.relay.handle(&headers, &body).await
}

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "NVIDIA NIM OpenAI-compatible proxy",
        "status": "running",
    }))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    Json(state.relay.aliases().model_list(chrono::Utc::now().timestamp()))
}

async fn handle_not_found(method: Method, uri: Uri) -> ProxyError {
    ProxyError::not_found(method.as_str(), uri.path())
}
