use super::types::{ChatCompletionResponse, UpstreamChatResponse};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

/// Reshape a buffered NIM response into the client-facing schema.
/// `client_model` is echoed back so clients see the name they asked for,
/// not the upstream identifier it was mapped to.
pub fn reshape_response(resp: UpstreamChatResponse, client_model: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
        object: "chat.completion".to_string(),
        created: Utc::now().timestamp(),
        model: client_model.to_string(),
        choices: resp.choices,
        usage: resp.usage.unwrap_or_default(),
    }
}

/// Pull a human-readable message out of an upstream error body.
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}`,
/// `{"message": ..}` and `{"detail": ..}`.
pub fn upstream_error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;

    let message = match value.get("error") {
        Some(Value::Object(err)) => err.get("message").and_then(Value::as_str),
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
    .or_else(|| value.get("message").and_then(Value::as_str))
    .or_else(|| value.get("detail").and_then(Value::as_str))?;

    if message.trim().is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
