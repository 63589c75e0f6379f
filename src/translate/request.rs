//! Translate `OpenAI` Chat Completions requests into Claude Messages API requests.
//!
//! Field mapping is a straight copy for model, token bound, sampling parameters
//! and messages. Extended thinking has no generic counterpart and is always
//! injected with a fixed budget.

use super::anthropic_types::{Message, MessagesRequest, ThinkingConfig};
use super::openai_types::{ChatCompletionRequest, ChatMessage, ChatRole};
use crate::error::{BridgeError, Result};

/// Thinking budget injected into every vendor request.
pub const DEFAULT_THINKING_BUDGET: u64 = 10_000;

/// `max_tokens` sent when the inbound request has none. The vendor requires the
/// field and it must exceed the thinking budget.
pub const DEFAULT_MAX_TOKENS: u64 = 16_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationPolicy {
    pub thinking_budget: u64,
    pub default_max_tokens: u64,
    /// Move `system` messages into the top-level `system` field.
    pub hoist_system: bool,
}

impl Default for TranslationPolicy {
    fn default() -> Self {
        Self {
            thinking_budget: DEFAULT_THINKING_BUDGET,
            default_max_tokens: DEFAULT_MAX_TOKENS,
            hoist_system: false,
        }
    }
}

/// Reject requests that cannot be translated at all.
pub fn validate(req: &ChatCompletionRequest) -> Result<()> {
    if req.model.trim().is_empty() {
        return Err(BridgeError::validation("'model' must be a non-empty string"));
    }
    if req.messages.is_empty() {
        return Err(BridgeError::validation("'messages' must contain at least one message"));
    }
    Ok(())
}

/// Translate a generic request into a Messages API request.
/// Pure function; fails only when `validate` does.
pub fn openai_to_anthropic(
    req: &ChatCompletionRequest,
    policy: &TranslationPolicy,
) -> Result<MessagesRequest> {
    validate(req)?;

    let mut system_parts: Vec<&str> = Vec::new();
    let mut messages = Vec::with_capacity(req.messages.len());

    for msg in &req.messages {
        let Some(message) = translate_message(msg) else {
            continue;
        };

        if policy.hoist_system && message.role == ChatRole::System {
            if let Some(text) = msg.content_str() {
                system_parts.push(text);
            }
            continue;
        }

        messages.push(message);
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n"))
    };

    Ok(MessagesRequest {
        model: req.model.clone(),
        max_tokens: req.max_tokens.unwrap_or(policy.default_max_tokens),
        messages,
        system,
        temperature: req.temperature,
        top_p: req.top_p,
        top_k: req.top_k,
        thinking: ThinkingConfig::enabled(policy.thinking_budget),
        stream: None,
    })
}

/// Messages with an unsupported role or without plain-string content are dropped.
fn translate_message(msg: &ChatMessage) -> Option<Message> {
    if msg.role == ChatRole::Unsupported {
        return None;
    }

    let content = msg.content_str().filter(|c| !c.is_empty())?;

    Some(Message {
        role: msg.role,
        content: content.to_string(),
    })
}
