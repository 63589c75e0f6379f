//! Outbound HTTP to the Claude Messages API.
//!
//! Unary calls carry a whole-request deadline. Streaming calls are bounded only
//! until response headers arrive; after that the returned byte stream is owned
//! by the caller and the connection closes when that stream is dropped.

use crate::config::VendorConfig;
use crate::credentials::CredentialStore;
use crate::error::{BridgeError, Result};
use crate::translate::anthropic_types::{ErrorResponse, MessagesRequest, MessagesResponse};

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;

/// Raw body of a streaming vendor response.
pub type VendorByteStream =
    Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>;

#[derive(Debug, Clone)]
pub struct VendorClient {
    client: reqwest::Client,
    messages_url: String,
    version: String,
    credentials: CredentialStore,
    timeout: Duration,
    connect_timeout: Duration,
}

impl VendorClient {
    pub fn new(config: &VendorConfig, credentials: CredentialStore) -> Result<Self> {
        let base = config.base_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(BridgeError::config(format!(
                "vendor.base_url must be an http(s) URL, got '{}'",
                config.base_url
            )));
        }

        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            messages_url: format!("{base}/messages"),
            version: config.version.clone(),
            credentials,
            timeout: Duration::from_secs(config.timeout_secs),
            connect_timeout,
        })
    }

    #[must_use]
    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    fn request(&self, req: &MessagesRequest) -> Result<reqwest::RequestBuilder> {
        let api_key = self
            .credentials
            .get()
            .ok_or_else(|| BridgeError::unavailable("Claude API key is not set"))?;

        Ok(self
            .client
            .post(&self.messages_url)
            .header("Content-Type", "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.version)
            .json(req))
    }

    /// Send a unary request and decode the vendor response.
    pub async fn send(&self, req: &MessagesRequest) -> Result<MessagesResponse> {
        let response = self
            .request(req)?
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| BridgeError::connection(format!("failed to send request: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::connection(format!("failed to read response: {e}")))?;

        tracing::debug!(status, body_len = body.len(), "Claude API response");

        if !(200..300).contains(&status) {
            log_vendor_error(status, &body);
            return Err(BridgeError::upstream(status, body));
        }

        serde_json::from_str(&body).map_err(|e| {
            BridgeError::upstream(status, format!("failed to decode response: {e}: {body}"))
        })
    }

    /// Send a streaming request and hand back the live response body.
    pub async fn send_streaming(&self, req: &MessagesRequest) -> Result<VendorByteStream> {
        let mut streaming_req = req.clone();
        streaming_req.stream = Some(true);

        let pending = self
            .request(&streaming_req)?
            .header("Accept", "text/event-stream")
            .send();

        let response = tokio::time::timeout(self.connect_timeout, pending)
            .await
            .map_err(|_| {
                BridgeError::connection(format!(
                    "no response headers within {}s",
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| BridgeError::connection(format!("failed to send request: {e}")))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            log_vendor_error(status, &body);
            return Err(BridgeError::upstream(status, body));
        }

        Ok(Box::pin(response.bytes_stream()))
    }
}

fn log_vendor_error(status: u16, body: &str) {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => tracing::warn!(
            status,
            error_type = %err.error.error_type,
            message = %err.error.message,
            "Claude API returned an error"
        ),
        Err(_) => tracing::warn!(status, "Claude API returned a non-JSON error body"),
    }
}
