use crate::error::{BridgeError, Result};
use crate::transport::VendorClient;
use crate::translate::openai_types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::translate::request::{openai_to_anthropic, TranslationPolicy};
use crate::translate::response::{anthropic_to_openai, has_thinking_content};
use crate::translate::streaming::{GenericStreamEvent, StreamReframer};

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::stream::{self, Stream};
use futures::StreamExt;
use std::pin::Pin;

/// Reframed generic events. An `Err` item is always the last one.
pub type GenericEventStream = Pin<Box<dyn Stream<Item = Result<GenericStreamEvent>> + Send>>;

/// Translate, call the Claude API, and translate the reply back.
pub async fn proxy_unary(
    req: &ChatCompletionRequest,
    policy: &TranslationPolicy,
    vendor: &VendorClient,
) -> Result<ChatCompletionResponse> {
    let vendor_req = openai_to_anthropic(req, policy)?;

    tracing::info!(
        url = %vendor.messages_url(),
        model = %vendor_req.model,
        messages = vendor_req.messages.len(),
        "POST Claude API"
    );

    let vendor_resp = vendor.send(&vendor_req).await?;

    tracing::debug!(
        id = %vendor_resp.id,
        blocks = vendor_resp.content.len(),
        thinking = has_thinking_content(&vendor_resp),
        "Claude API response decoded"
    );

    let resp = anthropic_to_openai(&vendor_resp, &req.model);

    tracing::info!(
        prompt_tokens = resp.usage.prompt_tokens,
        completion_tokens = resp.usage.completion_tokens,
        "Completed"
    );

    Ok(resp)
}

/// Translate and open a streaming call. Errors before the first byte (missing
/// credential, non-2xx status) surface here so the caller can still answer
/// with a plain error response.
pub async fn proxy_streaming(
    req: &ChatCompletionRequest,
    policy: &TranslationPolicy,
    vendor: &VendorClient,
) -> Result<GenericEventStream> {
    let vendor_req = openai_to_anthropic(req, policy)?;

    tracing::info!(
        url = %vendor.messages_url(),
        model = %vendor_req.model,
        messages = vendor_req.messages.len(),
        "POST Claude API (streaming)"
    );

    let byte_stream = vendor.send_streaming(&vendor_req).await?;

    Ok(Box::pin(reframe_stream(byte_stream, req.model.clone())))
}

/// Strip SSE framing from a vendor byte stream and reframe each payload.
///
/// The returned stream owns `byte_stream`; dropping it closes the upstream
/// connection. A final frame missing its blank-line terminator is still
/// dispatched at end of input.
pub fn reframe_stream<S, E>(
    byte_stream: S,
    model: String,
) -> impl Stream<Item = Result<GenericStreamEvent>> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut reframer = StreamReframer::new(&model);
        let terminated = byte_stream.chain(stream::once(async {
            Ok::<_, E>(Bytes::from_static(b"\n\n"))
        }));
        let events = terminated.eventsource();
        tokio::pin!(events);

        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(model = %model, "Stream read error: {e}");
                    reframer.abort();
                    yield Err(BridgeError::stream_decode(format!("stream read error: {e}")));
                    break;
                }
            };

            if event.data.trim().is_empty() {
                continue;
            }

            match reframer.process_data(&event.data) {
                Ok(Some(generic)) => yield Ok(generic),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(model = %model, event = %event.event, "Stream terminated: {e}");
                    yield Err(e);
                    break;
                }
            }

            if reframer.is_closed() {
                break;
            }
        }

        if let Some(done) = reframer.finish() {
            yield Ok(done);
        }

        tracing::info!(model = %model, "Stream completed");
    }
}
