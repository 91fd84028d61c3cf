//! Type definitions for the chat completions shapes on both sides of the proxy.
//!
//! The client speaks the OpenAI Chat Completions API; the upstream is an
//! NVIDIA NIM endpoint with the same general shape but its own model names
//! and stricter expectations about sampling parameters.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Inbound request (what the client sends US)
// ---------------------------------------------------------------------------

/// Client request body. Fields are kept as raw JSON so nothing is validated
/// here: malformed values either fall back to defaults or are passed through
/// for the upstream to reject.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundChatRequest {
    #[serde(default)]
    pub model: Value,
    #[serde(default)]
    pub messages: Value,
    #[serde(default)]
    pub temperature: Value,
    #[serde(default)]
    pub top_p: Value,
    #[serde(default)]
    pub max_tokens: Value,
    #[serde(default)]
    pub stream: Value,
}

impl InboundChatRequest {
    /// The model name the client asked for, if it is a non-empty string.
    #[must_use]
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_str().filter(|m| !m.is_empty())
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.stream.as_bool().unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Upstream request (what we send TO NIM)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamChatRequest {
    pub model: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub messages: Value,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u64,
    pub stream: bool,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Buffered (non-streaming) upstream response. Only the fields we forward are
/// kept; anything else NIM adds is dropped on deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u64,
    #[serde(default)]
    pub message: Value,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUsage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt_tokens: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completion_tokens: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tokens: u64,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response returned to the client in non-streaming mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: ChatUsage,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn invalid_request(message: impl Into<String>, code: u16) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: "invalid_request_error".to_string(),
                code,
            },
        }
    }
}
