//! Type definitions for the [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat).
//!
//! These are the generic shapes: what clients send TO the bridge and what the
//! bridge sends BACK, including streaming chunks and error bodies.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Request types (what clients send TO us)
// ---------------------------------------------------------------------------

/// Inbound chat completion request. Fields not listed here are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    #[serde(deserialize_with = "lenient_messages")]
    pub messages: Vec<ChatMessage>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub top_k: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: ChatRole,
    /// Plain strings are translated; any other JSON shape is dropped.
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    #[default]
    #[serde(other)]
    Unsupported,
}

impl ChatMessage {
    fn unusable() -> Self {
        Self {
            role: ChatRole::Unsupported,
            content: serde_json::Value::Null,
        }
    }
}

/// Elements that are not message objects become unusable messages, which the
/// translator drops, instead of failing the whole request.
fn lenient_messages<'de, D>(deserializer: D) -> Result<Vec<ChatMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap_or_else(|_| ChatMessage::unusable()))
        .collect())
}

/// Token counts may arrive as whole-number floats (`100.0`).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_u64() {
        return Ok(Some(n));
    }
    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {number}"
        ))),
    }
}

impl ChatCompletionRequest {
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

impl ChatMessage {
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: serde_json::Value::String(content.into()),
        }
    }

    #[must_use]
    pub fn content_str(&self) -> Option<&str> {
        self.content.as_str()
    }
}

// ---------------------------------------------------------------------------
// Response types (what we send BACK)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: ChatUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u64,
    pub message: ChoiceMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub role: String,
    pub content: String,
    /// Extended thinking text from the vendor, empty when there was none.
    pub reasoning_content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl ChatUsage {
    /// The total is always derived, never taken from upstream. Vendor counts
    /// are 32-bit, so the sum is exact.
    #[must_use]
    pub fn from_counts(prompt_tokens: u32, completion_tokens: u32) -> Self {
        let prompt_tokens = u64::from(prompt_tokens);
        let completion_tokens = u64::from(completion_tokens);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

// ---------------------------------------------------------------------------
// Streaming chunk types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u64,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatErrorResponse {
    pub error: ChatError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ChatErrorResponse {
    pub fn new(error_type: &str, message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            error: ChatError {
                message: message.into(),
                error_type: error_type.to_string(),
                code,
            },
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new("invalid_request_error", msg, None)
    }

    pub fn server_error(msg: impl Into<String>) -> Self {
        Self::new("server_error", msg, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_request() {
        let req: ChatCompletionRequest = serde_json::from_str(
            r#"{"model":"claude-sonnet-4-6","messages":[{"role":"user","content":"hi"}]}"#,
        )
        .unwrap();

        assert_eq!(req.model, "claude-sonnet-4-6");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, ChatRole::User);
        assert_eq!(req.messages[0].content_str(), Some("hi"));
        assert!(!req.is_streaming());
    }

    #[test]
    fn test_unknown_role_and_structured_content_still_parse() {
        let req: ChatCompletionRequest = serde_json::from_str(
            r#"{
                "model": "claude-sonnet-4-6",
                "stream": true,
                "stream_options": {"include_usage": true},
                "messages": [
                    {"role": "tool", "content": "42", "tool_call_id": "call_1"},
                    {"role": "user", "content": [{"type": "text", "text": "hi"}]}
                ]
            }"#,
        )
        .unwrap();

        assert!(req.is_streaming());
        assert_eq!(req.messages[0].role, ChatRole::Unsupported);
        assert_eq!(req.messages[1].content_str(), None);
    }

    #[test]
    fn test_missing_model_is_rejected_by_serde() {
        let parsed = serde_json::from_str::<ChatCompletionRequest>(
            r#"{"messages":[{"role":"user","content":"hi"}]}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unusable_messages_parse_as_unsupported() {
        let req: ChatCompletionRequest = serde_json::from_str(
            r#"{
                "model": "claude-sonnet-4-6",
                "messages": [
                    {"content": "no role"},
                    "junk",
                    {"role": 7, "content": "numeric role"},
                    {"role": "user", "content": "ok"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(req.messages.len(), 4);
        assert_eq!(req.messages[0].role, ChatRole::Unsupported);
        assert_eq!(req.messages[1].role, ChatRole::Unsupported);
        assert_eq!(req.messages[2].role, ChatRole::Unsupported);
        assert_eq!(req.messages[3].role, ChatRole::User);
    }

    #[test]
    fn test_whole_number_floats_are_accepted_as_counts() {
        let req: ChatCompletionRequest = serde_json::from_str(
            r#"{"model":"m","messages":[],"max_tokens":100.0,"top_k":40}"#,
        )
        .unwrap();
        assert_eq!(req.max_tokens, Some(100));
        assert_eq!(req.top_k, Some(40));

        let fractional = serde_json::from_str::<ChatCompletionRequest>(
            r#"{"model":"m","messages":[],"max_tokens":100.5}"#,
        );
        assert!(fractional.is_err());
        let negative = serde_json::from_str::<ChatCompletionRequest>(
            r#"{"model":"m","messages":[],"top_k":-1}"#,
        );
        assert!(negative.is_err());
    }

    #[test]
    fn test_usage_total_is_computed() {
        let usage = ChatUsage::from_counts(7, 11);
        assert_eq!(usage.total_tokens, 18);
        assert_eq!(
            ChatUsage::from_counts(u32::MAX, u32::MAX).total_tokens,
            2 * u64::from(u32::MAX)
        );
    }

    #[test]
    fn test_chunk_delta_omits_absent_fields() {
        let delta = ChunkDelta {
            content: Some("A".to_string()),
            ..ChunkDelta::default()
        };
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json, serde_json::json!({"content": "A"}));
    }
}
