//! Error types for the proxy.
//!
//! Every failure that reaches a client is rendered as the normalized
//! `{ "error": { "message", "type", "code" } }` body, with `code` matching
//! the HTTP status of the response.

use crate::translate::types::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

const GENERIC_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing API key: send an `Authorization: Bearer <key>` header or set NIM_API_KEY")]
    MissingCredential,

    #[error("{message}")]
    InvalidRequest { message: String },

    /// The upstream answered with a non-2xx status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// No response was received from the upstream.
    #[error("{message}")]
    Transport { message: String },

    #[error("Translation error: {message}")]
    Translation { message: String },

    #[error("Route {method} {path} not found")]
    NotFound { method: String, path: String },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn upstream(status: u16, msg: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
        }
    }

    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation {
            message: msg.into(),
        }
    }

    pub fn not_found(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::NotFound {
            method: method.into(),
            path: path.into(),
        }
    }

    /// HTTP status reported to the client, also used as the error body `code`.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingCredential => 401,
            Self::InvalidRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Upstream { status, .. } => *status,
            Self::Config { .. }
            | Self::Transport { .. }
            | Self::Translation { .. }
            | Self::Toml(_) => 500,
        }
    }

    /// Normalized error body for this failure.
    #[must_use]
    pub fn to_error_response(&self) -> ErrorResponse {
        let message = self.to_string();
        let message = if message.trim().is_empty() {
            GENERIC_MESSAGE.to_string()
        } else {
            message
        };
        ErrorResponse::invalid_request(message, self.status_code())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_error_response())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProxyError::MissingCredential.status_code(), 401);
        assert_eq!(ProxyError::invalid_request("bad").status_code(), 400);
        assert_eq!(ProxyError::not_found("GET", "/nope").status_code(), 404);
        assert_eq!(ProxyError::upstream(429, "rate limited").status_code(), 429);
        assert_eq!(ProxyError::transport("connection refused").status_code(), 500);
        assert_eq!(ProxyError::translation("bad body").status_code(), 500);
        let toml_err = toml::from_str::<crate::config::ProxyConfig>("port = \"x\"").unwrap_err();
        assert_eq!(ProxyError::from(toml_err).status_code(), 500);
    }

    #[test]
    fn test_upstream_message_is_propagated_verbatim() {
        let body = ProxyError::upstream(429, "rate limited").to_error_response();
        assert_eq!(body.error.message, "rate limited");
        assert_eq!(body.error.error_type, "invalid_request_error");
        assert_eq!(body.error.code, 429);
    }

    #[test]
    fn test_not_found_names_path() {
        let body = ProxyError::not_found("GET", "/v2/unknown").to_error_response();
        assert_eq!(body.error.message, "Route GET /v2/unknown not found");
        assert_eq!(body.error.code, 404);
    }

    #[test]
    fn test_empty_message_falls_back_to_generic() {
        let body = ProxyError::upstream(502, "").to_error_response();
        assert_eq!(body.error.message, "Internal server error");
        assert_eq!(body.error.code, 502);
    }
}
