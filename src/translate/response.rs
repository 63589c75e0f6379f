use super::anthropic_types::{ContentBlock, MessagesResponse};
use super::openai_types::{ChatCompletionResponse, ChatUsage, Choice, ChoiceMessage};

/// Translate a Claude Messages response into an `OpenAI` Chat Completion response.
/// Pure function: `requested_model` is what the client originally asked for.
pub fn anthropic_to_openai(resp: &MessagesResponse, requested_model: &str) -> ChatCompletionResponse {
    let blocks = extract_blocks(&resp.content);

    if blocks.skipped > 0 {
        tracing::debug!(
            skipped = blocks.skipped,
            "Dropped content blocks with no generic counterpart"
        );
    }

    let finish_reason = resp
        .stop_reason
        .as_deref()
        .map_or("stop", map_stop_reason);

    ChatCompletionResponse {
        id: resp.id.clone(),
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: requested_model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".to_string(),
                content: blocks.text.unwrap_or_default().to_string(),
                reasoning_content: blocks.thinking.unwrap_or_default().to_string(),
            },
            finish_reason: Some(finish_reason.to_string()),
        }],
        usage: ChatUsage::from_counts(resp.usage.input_tokens, resp.usage.output_tokens),
    }
}

#[derive(Debug, Default)]
struct ExtractedBlocks<'a> {
    text: Option<&'a str>,
    thinking: Option<&'a str>,
    skipped: usize,
}

/// Single pass; the first block of each kind wins.
fn extract_blocks(content: &[ContentBlock]) -> ExtractedBlocks<'_> {
    let mut out = ExtractedBlocks::default();
    for block in content {
        match block {
            ContentBlock::Text { text } => {
                out.text.get_or_insert(text.as_str());
            }
            ContentBlock::Thinking { thinking, .. } => {
                out.thinking.get_or_insert(thinking.as_str());
            }
            ContentBlock::Unknown => out.skipped += 1,
        }
    }
    out
}

/// Whether the response carries any non-empty thinking text.
#[must_use]
pub fn has_thinking_content(resp: &MessagesResponse) -> bool {
    resp.content
        .iter()
        .any(|b| matches!(b, ContentBlock::Thinking { thinking, .. } if !thinking.is_empty()))
}

/// Map Claude `stop_reason` to `OpenAI` `finish_reason`
pub fn map_stop_reason(reason: &str) -> &'static str {
    match reason {
        "max_tokens" => "length",
        "tool_use" => "tool_calls",
        "refusal" => "content_filter",
        _ => "stop",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::anthropic_types::Usage;

    fn make_response(content: Vec<ContentBlock>) -> MessagesResponse {
        MessagesResponse {
            id: "msg_123".to_string(),
            response_type: "message".to_string(),
            role: "assistant".to_string(),
            content,
            model: "claude-sonnet-4-6-20260101".to_string(),
            stop_reason: Some("end_turn".to_string()),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
            },
        }
    }

    #[test]
    fn test_thinking_and_text_are_split() {
        let resp = make_response(vec![
            ContentBlock::Thinking {
                thinking: "Let me think about this...".to_string(),
                signature: Some("sig".to_string()),
            },
            ContentBlock::Text {
                text: "2+2 equals 4".to_string(),
            },
        ]);

        let result = anthropic_to_openai(&resp, "claude-sonnet-4-6");

        assert_eq!(result.id, "msg_123");
        assert_eq!(result.object, "chat.completion");
        assert_eq!(result.model, "claude-sonnet-4-6");
        assert_eq!(result.choices.len(), 1);
        assert_eq!(result.choices[0].message.content, "2+2 equals 4");
        assert_eq!(
            result.choices[0].message.reasoning_content,
            "Let me think about this..."
        );
        assert_eq!(result.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(result.usage.prompt_tokens, 10);
        assert_eq!(result.usage.completion_tokens, 20);
        assert_eq!(result.usage.total_tokens, 30);
    }

    #[test]
    fn test_first_block_of_each_kind_wins() {
        let resp = make_response(vec![
            ContentBlock::Text {
                text: "first".to_string(),
            },
            ContentBlock::Thinking {
                thinking: "early".to_string(),
                signature: None,
            },
            ContentBlock::Text {
                text: "second".to_string(),
            },
            ContentBlock::Thinking {
                thinking: "late".to_string(),
                signature: None,
            },
        ]);

        let result = anthropic_to_openai(&resp, "claude-sonnet-4-6");
        assert_eq!(result.choices[0].message.content, "first");
        assert_eq!(result.choices[0].message.reasoning_content, "early");
    }

    #[test]
    fn test_empty_content_is_not_an_error() {
        let resp = make_response(Vec::new());
        let result = anthropic_to_openai(&resp, "claude-sonnet-4-6");

        assert_eq!(result.choices[0].message.content, "");
        assert_eq!(result.choices[0].message.reasoning_content, "");
    }

    #[test]
    fn test_unknown_blocks_are_dropped() {
        let resp = make_response(vec![
            ContentBlock::Unknown,
            ContentBlock::Text {
                text: "after the tool call".to_string(),
            },
        ]);

        let result = anthropic_to_openai(&resp, "claude-sonnet-4-6");
        assert_eq!(result.choices[0].message.content, "after the tool call");
    }

    #[test]
    fn test_model_is_echoed_from_request() {
        let resp = make_response(Vec::new());
        let result = anthropic_to_openai(&resp, "claude-latest-alias");
        assert_eq!(result.model, "claude-latest-alias");
    }

    #[test]
    fn test_has_thinking_content() {
        let with = make_response(vec![ContentBlock::Thinking {
            thinking: "hmm".to_string(),
            signature: None,
        }]);
        let empty = make_response(vec![ContentBlock::Thinking {
            thinking: String::new(),
            signature: None,
        }]);
        let without = make_response(vec![ContentBlock::Text {
            text: "hi".to_string(),
        }]);

        assert!(has_thinking_content(&with));
        assert!(!has_thinking_content(&empty));
        assert!(!has_thinking_content(&without));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason("end_turn"), "stop");
        assert_eq!(map_stop_reason("stop_sequence"), "stop");
        assert_eq!(map_stop_reason("max_tokens"), "length");
        assert_eq!(map_stop_reason("tool_use"), "tool_calls");
        assert_eq!(map_stop_reason("something_new"), "stop");
    }
}
