//! Error types for the bridge.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    /// Malformed inbound JSON or a missing required field. Never retried.
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// The vendor API cannot be used right now (no credential, no client).
    #[error("Backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// Non-2xx from an upstream, or the connection itself failed (`status` is `None`).
    #[error("{}", upstream_message(.status, .body))]
    Upstream { status: Option<u16>, body: String },

    #[error("Stream decode error: {message}")]
    StreamDecode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn upstream_message(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("API error: {code} - {body}"),
        None => format!("Upstream request failed: {body}"),
    }
}

impl BridgeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: msg.into(),
        }
    }

    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status: Some(status),
            body: body.into(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            body: msg.into(),
        }
    }

    pub fn stream_decode(msg: impl Into<String>) -> Self {
        Self::StreamDecode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// HTTP status the inbound client should see for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::BackendUnavailable { .. } => 503,
            _ => 500,
        }
    }

    /// Error `type` string in the generic error body.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "invalid_request_error",
            _ => "server_error",
        }
    }

    /// Upstream status, when this error came from a vendor response.
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
