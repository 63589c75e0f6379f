//! Demonstrate the translation layer without a server.
//!
//! Usage:
//!   `cargo run --example translate_only`

use claude_bridge::translate::anthropic_types::{ContentBlock, MessagesResponse, Usage};
use claude_bridge::translate::openai_types::{ChatCompletionRequest, ChatMessage, ChatRole};
use claude_bridge::translate::request::{openai_to_anthropic, TranslationPolicy};
use claude_bridge::translate::response::anthropic_to_openai;
use claude_bridge::translate::streaming::StreamReframer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // What an OpenAI-style client sends
    let req = ChatCompletionRequest {
        model: "claude-sonnet-4-6".to_string(),
        messages: vec![
            ChatMessage::text(ChatRole::System, "You are a geography expert. Be concise."),
            ChatMessage::text(ChatRole::User, "What is the capital of France?"),
            ChatMessage::text(ChatRole::Assistant, "Paris."),
            ChatMessage::text(ChatRole::User, "And Germany?"),
        ],
        max_tokens: None,
        temperature: Some(0.7),
        top_p: None,
        top_k: None,
        stream: Some(true),
    };

    let vendor_req = openai_to_anthropic(&req, &TranslationPolicy::default())?;

    println!("=== Translated Request (Messages API) ===");
    println!("{}", serde_json::to_string_pretty(&vendor_req)?);

    // A Messages API reply with a thinking block
    let vendor_resp = MessagesResponse {
        id: "msg_demo".to_string(),
        response_type: "message".to_string(),
        role: "assistant".to_string(),
        content: vec![
            ContentBlock::Thinking {
                thinking: "Germany's capital moved back to Berlin in 1990.".to_string(),
                signature: None,
            },
            ContentBlock::Text {
                text: "Berlin.".to_string(),
            },
        ],
        model: "claude-sonnet-4-6".to_string(),
        stop_reason: Some("end_turn".to_string()),
        usage: Usage {
            input_tokens: 42,
            output_tokens: 8,
        },
    };

    let resp = anthropic_to_openai(&vendor_resp, &req.model);

    println!();
    println!("=== Translated Response (chat completion) ===");
    println!("{}", serde_json::to_string_pretty(&resp)?);

    println!();
    println!("=== Stream Reframing Demo ===");

    let mut reframer = StreamReframer::new(&req.model);
    let payloads = [
        r#"{"type":"content_block_start","index":0}"#,
        r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Ber"}}"#,
        r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"lin."}}"#,
        r#"{"type":"message_stop"}"#,
    ];

    for payload in payloads {
        if let Some(event) = reframer.process_data(payload)? {
            for data in event.sse_payloads() {
                println!("  data: {data}");
            }
        }
    }

    println!();
    println!("Done! The translation layer works without any network calls.");
    Ok(())
}
