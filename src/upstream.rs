//! Outbound calls to the NIM chat completions endpoint.
//!
//! The relay talks to the upstream only through the [`Upstream`] trait so
//! tests can substitute a fake that records calls and scripts responses.

use crate::error::{ProxyError, Result};
use crate::translate::types::UpstreamChatRequest;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;

/// Upstream response body, delivered chunk by chunk as it arrives.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

pub struct UpstreamResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Buffer the whole body.
    pub async fn collect(mut self) -> std::io::Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Upstream: Send + Sync {
    /// Issue one chat completions call authenticated with `api_key`.
    ///
    /// Any HTTP status is returned as a response; only a failure to get a
    /// response at all is an error.
    async fn chat_completions(
        &self,
        request: &UpstreamChatRequest,
        api_key: &str,
    ) -> Result<UpstreamResponse>;
}

/// [`Upstream`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn chat_completions(
        &self,
        request: &UpstreamChatRequest,
        api_key: &str,
    ) -> Result<UpstreamResponse> {
        let url = self.endpoint();

        tracing::debug!(%url, model = %request.model, stream = request.stream, "POST upstream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ProxyError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));

        Ok(UpstreamResponse::new(status, Box::pin(body)))
    }
}
