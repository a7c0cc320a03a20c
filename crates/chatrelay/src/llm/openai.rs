//! OpenAI-compatible LLM provider.
//!
//! Works with OpenAI, Groq, and other APIs exposing `/chat/completions`.
//! Their streamed bodies already use the outgoing chunk format, so replies
//! are forwarded byte-for-byte.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;

use super::error::{LLMError, check_status};
use super::provider::{LLMProvider, ProviderOptions, ProviderReply};
use super::types::Message;

/// OpenAI-compatible provider with a passthrough stream.
pub struct OpenAICompatibleProvider {
    client: Client,
    options: ProviderOptions,
}

impl OpenAICompatibleProvider {
    #[must_use]
    pub fn new(client: Client, options: ProviderOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn id(&self) -> &str {
        &self.options.id
    }

    fn has_credential(&self) -> bool {
        self.options.api_key.is_some()
    }

    fn allows_anonymous(&self) -> bool {
        self.options.anonymous
    }

    async fn send(&self, messages: &[Message]) -> Result<ProviderReply, LLMError> {
        let url = format!("{}/chat/completions", self.options.base_url);

        let stream_request = StreamRequest {
            model: &self.options.model,
            messages,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            stream: true,
        };

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref key) = self.options.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = check_status(req.json(&stream_request).send().await?).await?;
        let byte_stream = response.bytes_stream().map(|chunk| chunk.map_err(LLMError::from));

        Ok(ProviderReply::Passthrough(Box::pin(byte_stream)))
    }
}

#[derive(Serialize)]
struct StreamRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use bytes::Bytes;
    use serde_json::Value;

    use super::*;
    use crate::testing::serve;

    const UPSTREAM_BODY: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
                                 data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n\
                                 data: [DONE]\n\n";

    type Captured = Arc<Mutex<Option<(Option<String>, Value)>>>;

    async fn completions(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> &'static str {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *captured.lock().unwrap() = Some((auth, body));
        UPSTREAM_BODY
    }

    fn provider(base_url: &str, api_key: Option<&str>) -> OpenAICompatibleProvider {
        let options = ProviderOptions::new("groq", base_url, "llama-3.1-8b-instant")
            .api_key(api_key.map(str::to_string))
            .sampling(Some(0.7), Some(1000));
        OpenAICompatibleProvider::new(Client::new(), options)
    }

    #[tokio::test]
    async fn forwards_upstream_body_unchanged() {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route("/chat/completions", post(completions))
            .with_state(captured.clone());
        let base_url = serve(app).await;

        let reply = provider(&base_url, Some("gsk-test"))
            .send(&[Message::user("Hello")])
            .await
            .unwrap();

        let ProviderReply::Passthrough(stream) = reply else {
            panic!("expected passthrough reply");
        };
        let parts: Vec<Bytes> = stream.map(|b| b.unwrap()).collect().await;
        assert_eq!(parts.concat(), UPSTREAM_BODY.as_bytes());

        let (auth, body) = captured.lock().unwrap().take().unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer gsk-test"));
        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
        );
        let base_url = serve(app).await;

        let err = provider(&base_url, Some("bad"))
            .send(&[Message::user("Hello")])
            .await
            .unwrap_err();

        match err {
            LLMError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid api key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_upstream_is_request_error() {
        let err = provider("http://127.0.0.1:1", Some("key"))
            .send(&[Message::user("Hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::Request(_)));
    }

    #[test]
    fn credential_presence() {
        assert!(provider("http://localhost", Some("k")).has_credential());
        assert!(!provider("http://localhost", None).has_credential());
        assert!(!provider("http://localhost", None).allows_anonymous());
    }
}
