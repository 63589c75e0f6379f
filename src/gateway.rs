//! Pass-through to the OpenAI-compatible fallback gateway.
//!
//! Requests that cannot use the Claude API directly are forwarded untouched;
//! the gateway already speaks the generic format.

use crate::error::{BridgeError, Result};

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

pub type GatewayBody = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>;

/// Upstream reply, relayed as-is. Event-stream bodies are not buffered.
pub struct GatewayResponse {
    pub status: u16,
    pub content_type: String,
    pub body: GatewayBody,
}

impl GatewayResponse {
    #[must_use]
    pub fn is_event_stream(&self) -> bool {
        self.content_type.contains("text/event-stream")
    }
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    completions_url: String,
    api_key: Option<String>,
}

impl GatewayClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            completions_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
        }
    }

    #[must_use]
    pub fn completions_url(&self) -> &str {
        &self.completions_url
    }

    /// Forward the raw inbound body.
    pub async fn forward(&self, body: Bytes) -> Result<GatewayResponse> {
        tracing::info!(url = %self.completions_url, "Forwarding to fallback gateway");

        let mut builder = self
            .client
            .post(&self.completions_url)
            .header("Content-Type", "application/json");

        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| BridgeError::connection(format!("gateway request failed: {e}")))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();

        tracing::info!(status, content_type = %content_type, "Gateway responded");

        Ok(GatewayResponse {
            status,
            content_type,
            body: Box::pin(response.bytes_stream()),
        })
    }
}
