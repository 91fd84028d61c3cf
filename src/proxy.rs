use crate::error::{ProxyError, Result};
use crate::models::AliasTable;
use crate::translate::request::build_upstream_request;
use crate::translate::response::{reshape_response, upstream_error_message};
use crate::translate::types::{InboundChatRequest, UpstreamChatResponse};
use crate::upstream::{ByteStream, Upstream, UpstreamResponse};

use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::TryStreamExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Relays chat completions requests to the upstream.
///
/// Holds everything a request needs: the outbound collaborator, the alias
/// table and the credential to use when the client sends none.
#[derive(Clone)]
pub struct Relay {
    upstream: Arc<dyn Upstream>,
    aliases: AliasTable,
    fallback_api_key: Option<String>,
}

impl Relay {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        aliases: AliasTable,
        fallback_api_key: Option<String>,
    ) -> Self {
        Self {
            upstream,
            aliases,
            fallback_api_key: fallback_api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Pick the upstream credential: the client's bearer token if present,
    /// otherwise the configured key.
    ///
    /// # Errors
    /// Returns `ProxyError::MissingCredential` if neither is available.
    pub fn resolve_api_key(&self, headers: &HeaderMap) -> Result<String> {
        bearer_token(headers)
            .map(str::to_string)
            .or_else(|| self.fallback_api_key.clone())
            .ok_or(ProxyError::MissingCredential)
    }

    /// Handle one `POST /v1/chat/completions` request. Never fails: errors
    /// become the normalized error response.
    pub async fn handle(&self, headers: &HeaderMap, body: &[u8]) -> Response {
        match self.relay(headers, body).await {
            Ok(response) => response,
            Err(e) => {
                warn!(status = e.status_code(), "Chat completion failed: {}", e);
                e.into_response()
            }
        }
    }

    async fn relay(&self, headers: &HeaderMap, body: &[u8]) -> Result<Response> {
        let api_key = self.resolve_api_key(headers)?;

        let value: Value = serde_json::from_slice(body).map_err(|e| {
            ProxyError::invalid_request(format!("Invalid JSON in request body: {e}"))
        })?;
        if !value.is_object() {
            return Err(ProxyError::invalid_request(
                "Invalid JSON in request body: expected an object",
            ));
        }
        let req: InboundChatRequest = serde_json::from_value(value).map_err(|e| {
            ProxyError::invalid_request(format!("Invalid JSON in request body: {e}"))
        })?;

        let upstream_req = build_upstream_request(&req, &self.aliases);
        let client_model = req
            .model_name()
            .unwrap_or(upstream_req.model.as_str())
            .to_string();

        info!(
            model = %client_model,
            upstream_model = %upstream_req.model,
            stream = upstream_req.stream,
            "Relaying chat completion"
        );

        let response = self
            .upstream
            .chat_completions(&upstream_req, &api_key)
            .await?;

        if !response.is_success() {
            return Err(upstream_failure(response).await);
        }

        if upstream_req.stream {
            return Ok(event_stream_response(response.body));
        }

        let status = response.status;
        let bytes = response
            .collect()
            .await
            .map_err(|e| ProxyError::transport(format!("Failed to read upstream response: {e}")))?;

        let parsed: UpstreamChatResponse = serde_json::from_slice(&bytes).map_err(|e| {
            ProxyError::translation(format!("Failed to parse upstream response: {e}"))
        })?;

        let resp = reshape_response(parsed, &client_model);

        info!(
            status,
            prompt_tokens = resp.usage.prompt_tokens,
            completion_tokens = resp.usage.completion_tokens,
            "Completed"
        );

        Ok(Json(resp).into_response())
    }
}

/// Turn a non-2xx upstream response into an error carrying its status.
async fn upstream_failure(response: UpstreamResponse) -> ProxyError {
    let status = response.status;
    let body = response.collect().await.unwrap_or_default();

    let message = upstream_error_message(&body)
        .unwrap_or_else(|| format!("Upstream request failed with status code {status}"));

    ProxyError::upstream(status, message)
}

/// Relay upstream bytes to the client as they arrive, without inspecting
/// individual events.
fn event_stream_response(body: ByteStream) -> Response {
    let body = body.inspect_err(|e| error!("Upstream stream error: {}", e));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::types::UpstreamChatRequest;
    use async_trait::async_trait;
    use axum::http::HeaderValue;

    struct Unreachable;

    #[async_trait]
    impl Upstream for Unreachable {
        async fn chat_completions(
            &self,
            _request: &UpstreamChatRequest,
            _api_key: &str,
        ) -> Result<UpstreamResponse> {
            Err(ProxyError::transport("connection refused"))
        }
    }

    fn relay(fallback: Option<&str>) -> Relay {
        Relay::new(
            Arc::new(Unreachable),
            AliasTable::builtin(),
            fallback.map(str::to_string),
        )
    }

    fn auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_wins_over_fallback() {
        let key = relay(Some("server-key"))
            .resolve_api_key(&auth("Bearer client-key"))
            .unwrap();
        assert_eq!(key, "client-key");
    }

    #[test]
    fn test_fallback_used_without_header() {
        let key = relay(Some("server-key"))
            .resolve_api_key(&HeaderMap::new())
            .unwrap();
        assert_eq!(key, "server-key");
    }

    #[test]
    fn test_non_bearer_header_is_ignored() {
        let key = relay(Some("server-key"))
            .resolve_api_key(&auth("Basic dXNlcjpwYXNz"))
            .unwrap();
        assert_eq!(key, "server-key");
    }

    #[test]
    fn test_missing_credential() {
        assert!(matches!(
            relay(None).resolve_api_key(&auth("Bearer ")),
            Err(ProxyError::MissingCredential)
        ));
        assert!(matches!(
            relay(Some("  ")).resolve_api_key(&HeaderMap::new()),
            Err(ProxyError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_500() {
        let response = relay(Some("key"))
            .handle(&HeaderMap::new(), br#"{"model":"gpt-4"}"#)
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_non_object_body_is_400() {
        let bodies: [&[u8]; 4] = [b"[]", br#"["gpt-4", [], 0.2]"#, b"\"hi\"", b"null"];
        for body in bodies {
            let response = relay(Some("key")).handle(&HeaderMap::new(), body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_400() {
        let response = relay(Some("key")).handle(&HeaderMap::new(), b"{not json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
