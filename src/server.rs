use crate::backend::{classify_model, BackendSelector, BackendTarget, ModelFamily};
use crate::config::ProxyConfig;
use crate::error::BridgeError;
use crate::gateway::{GatewayClient, GatewayResponse};
use crate::journal::{JournalEntry, Outcome, RequestJournal};
use crate::proxy;
use crate::translate::openai_types::{ChatCompletionRequest, ChatErrorResponse};
use crate::translate::request::{validate, TranslationPolicy};
use crate::transport::VendorClient;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub selector: BackendSelector,
    pub vendor: Option<VendorClient>,
    pub gateway: Option<GatewayClient>,
    pub policy: TranslationPolicy,
    pub journal: Option<RequestJournal>,
}

impl AppState {
    fn record(&self, entry: JournalEntry) {
        if let Some(ref journal) = self.journal {
            journal.record(entry);
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/health", get(handle_health))
        .route("/v1/models", get(handle_models))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Render a bridge error as the generic error body.
pub fn error_response(err: &BridgeError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ChatErrorResponse::new(
        err.error_type(),
        err.to_string(),
        err.upstream_status().map(|s| s.to_string()),
    );
    (status, Json(body)).into_response()
}

async fn handle_chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(request_id = %request_id, "Failed to parse request: {e}");
            let err = BridgeError::validation(e.to_string());
            state.record(
                JournalEntry::new(&request_id, "", None, false, Outcome::Rejected)
                    .with_detail(err.to_string()),
            );
            return error_response(&err);
        }
    };

    let streaming = req.is_streaming();

    if let Err(err) = validate(&req) {
        state.record(
            JournalEntry::new(&request_id, &req.model, None, streaming, Outcome::Rejected)
                .with_detail(err.to_string()),
        );
        return error_response(&err);
    }

    let target = state.selector.select(&req.model);

    tracing::info!(
        request_id = %request_id,
        model = %req.model,
        backend = %target,
        streaming,
        messages = req.messages.len(),
        "Request"
    );

    match target {
        BackendTarget::VendorDirect => match state.vendor {
            Some(ref vendor) if streaming => {
                handle_streaming(&state, vendor, &req, &request_id).await
            }
            Some(ref vendor) => handle_unary(&state, vendor, &req, &request_id).await,
            None => {
                let err = BridgeError::unavailable("Claude API client is not initialized");
                state.record(
                    JournalEntry::new(&request_id, &req.model, Some(target), streaming, Outcome::Rejected)
                        .with_detail(err.to_string()),
                );
                error_response(&err)
            }
        },
        BackendTarget::FallbackGateway | BackendTarget::Unrouted => {
            handle_gateway(&state, target, &req, body, &request_id).await
        }
    }
}

async fn handle_unary(
    state: &AppState,
    vendor: &VendorClient,
    req: &ChatCompletionRequest,
    request_id: &str,
) -> Response {
    let entry = |outcome| {
        JournalEntry::new(
            request_id,
            &req.model,
            Some(BackendTarget::VendorDirect),
            false,
            outcome,
        )
    };

    match proxy::proxy_unary(req, &state.policy, vendor).await {
        Ok(resp) => {
            state.record(
                entry(Outcome::Completed)
                    .with_usage(resp.usage.prompt_tokens, resp.usage.completion_tokens),
            );
            Json(resp).into_response()
        }
        Err(err) => {
            tracing::error!(request_id, "Claude API request failed: {err}");
            state.record(entry(outcome_for(&err)).with_detail(err.to_string()));
            error_response(&err)
        }
    }
}

async fn handle_streaming(
    state: &AppState,
    vendor: &VendorClient,
    req: &ChatCompletionRequest,
    request_id: &str,
) -> Response {
    let entry = |outcome| {
        JournalEntry::new(
            request_id,
            &req.model,
            Some(BackendTarget::VendorDirect),
            true,
            outcome,
        )
    };

    let events = match proxy::proxy_streaming(req, &state.policy, vendor).await {
        Ok(s) => s,
        Err(err) => {
            tracing::error!(request_id, "Streaming setup failed: {err}");
            state.record(entry(outcome_for(&err)).with_detail(err.to_string()));
            return error_response(&err);
        }
    };

    // Journaled once the stream ends; a client disconnect leaves no entry.
    let journal = state.journal.clone();
    let pending = entry(Outcome::Completed);

    // An error ends the stream without a sentinel; the client sees truncation.
    let sse_events = events
        .scan(Some(pending), move |pending, item| {
            let out = match item {
                Ok(event) => {
                    if event.is_terminal() {
                        if let (Some(journal), Some(entry)) = (journal.as_ref(), pending.take()) {
                            journal.record(entry);
                        }
                    }
                    Some(event.sse_payloads())
                }
                Err(err) => {
                    if let (Some(journal), Some(mut entry)) = (journal.as_ref(), pending.take()) {
                        entry.outcome = outcome_for(&err);
                        journal.record(entry.with_detail(err.to_string()));
                    }
                    None
                }
            };
            futures::future::ready(out)
        })
        .flat_map(|payloads| {
            stream::iter(
                payloads
                    .into_iter()
                    .map(|data| Ok::<Event, Infallible>(Event::default().data(data))),
            )
        });

    let mut response = Sse::new(sse_events)
        .keep_alive(KeepAlive::default())
        .into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, header::HeaderValue::from_static("keep-alive"));
    response
}

async fn handle_gateway(
    state: &AppState,
    target: BackendTarget,
    req: &ChatCompletionRequest,
    body: Bytes,
    request_id: &str,
) -> Response {
    let entry =
        |outcome| JournalEntry::new(request_id, &req.model, Some(target), req.is_streaming(), outcome);

    let Some(ref gateway) = state.gateway else {
        let err = match target {
            BackendTarget::Unrouted => {
                BridgeError::validation(format!("no backend serves model '{}'", req.model))
            }
            _ => BridgeError::unavailable(format!(
                "Claude API unavailable for model '{}' and no fallback gateway is configured",
                req.model
            )),
        };
        tracing::warn!(request_id, backend = %target, "{err}");
        state.record(entry(Outcome::Rejected).with_detail(err.to_string()));
        return error_response(&err);
    };

    match gateway.forward(body).await {
        Ok(resp) => {
            state.record(entry(Outcome::Forwarded).with_detail(format!("status {}", resp.status)));
            relay(resp)
        }
        Err(err) => {
            tracing::error!(request_id, "Gateway request failed: {err}");
            state.record(entry(Outcome::UpstreamFailed).with_detail(err.to_string()));
            error_response(&err)
        }
    }
}

fn relay(resp: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, resp.content_type.as_str());

    if resp.is_event_stream() {
        builder = builder
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::CONNECTION, "keep-alive");
    }

    builder
        .body(Body::from_stream(resp.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn outcome_for(err: &BridgeError) -> Outcome {
    match err {
        BridgeError::Validation { .. } | BridgeError::BackendUnavailable { .. } => Outcome::Rejected,
        BridgeError::StreamDecode { .. } => Outcome::StreamAborted,
        _ => Outcome::UpstreamFailed,
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let availability = state.selector.availability();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "credential_present": availability.credential_present,
        "vendor_ready": availability.is_available(),
        "gateway_configured": state.gateway.is_some(),
    }))
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let models: Vec<serde_json::Value> = state
        .config
        .models
        .catalog
        .iter()
        .map(|id| {
            let family = match classify_model(id) {
                ModelFamily::Claude => "claude",
                ModelFamily::Gemini => "gemini",
                ModelFamily::Other => "other",
            };
            serde_json::json!({
                "id": id,
                "object": "model",
                "owned_by": state.selector.select(id).label(),
                "family": family,
            })
        })
        .collect();

    Json(serde_json::json!({ "data": models, "object": "list" }))
}
