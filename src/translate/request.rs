use super::types::{InboundChatRequest, UpstreamChatRequest};
use crate::models::AliasTable;
use serde_json::Value;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 1.0;
pub const DEFAULT_MAX_TOKENS: u64 = 1024;

/// Build the NIM request for a client request.
/// Pure function: the model is resolved through `aliases`, sampling
/// parameters get defaults when absent or not numeric, and `messages` is
/// forwarded untouched.
pub fn build_upstream_request(
    req: &InboundChatRequest,
    aliases: &AliasTable,
) -> UpstreamChatRequest {
    UpstreamChatRequest {
        model: aliases.resolve(req.model_name()),
        messages: req.messages.clone(),
        temperature: number_or(&req.temperature, DEFAULT_TEMPERATURE),
        top_p: number_or(&req.top_p, DEFAULT_TOP_P),
        max_tokens: req.max_tokens.as_u64().unwrap_or(DEFAULT_MAX_TOKENS),
        stream: req.is_streaming(),
    }
}

fn number_or(value: &Value, default: f64) -> f64 {
    value.as_f64().unwrap_or(default)
}
