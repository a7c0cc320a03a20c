//! Chat completion handler.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::debug;

use crate::dispatch::{Dispatch, DispatchError};
use crate::llm::Message;
use crate::response;
use crate::server::AppState;

/// Names the provider that produced a streamed reply.
pub const PROVIDER_HEADER: HeaderName = HeaderName::from_static("x-chat-provider");

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    messages: Vec<Message>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    model: Option<String>,
    // Accepted from existing clients; dispatch is driven by server config.
    #[serde(default)]
    #[allow(dead_code)]
    settings: Option<serde_json::Value>,
    #[serde(default)]
    #[allow(dead_code)]
    api_key: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/chat, POST /api/v1/chat
///
/// Request body: `{"messages": [{"role": "user", "content": "..."}]}`
///
/// On success streams `data: {"choices":[{"delta":{"content":"..."}}]}` events
/// ending with `data: [DONE]`. Fails with 400 for an empty or malformed
/// conversation and 503 once every provider has been tried.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return response::bad_request(rejection.body_text()),
    };

    debug!(
        requested_provider = ?req.provider,
        requested_model = ?req.model,
        "Chat request received"
    );

    match state.dispatcher.dispatch(&req.messages).await {
        Ok(dispatch) => stream_response(dispatch),
        Err(DispatchError::InvalidInput(message)) => response::bad_request(message),
        Err(e @ DispatchError::Exhausted { .. }) => response::service_unavailable(e.to_string()),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn stream_response(dispatch: Dispatch) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    if let Ok(value) = HeaderValue::from_str(&dispatch.provider) {
        headers.insert(PROVIDER_HEADER, value);
    }

    (StatusCode::OK, headers, Body::from_stream(dispatch.stream)).into_response()
}
