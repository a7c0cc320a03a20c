//! Hugging Face Inference API provider.
//!
//! Text-generation models take a single prompt, so only the final message
//! is sent. The free tier accepts anonymous calls; a token is attached when
//! configured.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{LLMError, check_status};
use super::provider::{LLMProvider, ProviderOptions, ProviderReply};
use super::types::Message;

pub struct HuggingFaceProvider {
    client: Client,
    options: ProviderOptions,
}

impl HuggingFaceProvider {
    #[must_use]
    pub fn new(client: Client, options: ProviderOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl LLMProvider for HuggingFaceProvider {
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
        let Some(last) = messages.last() else {
            return Err(LLMError::MalformedBody(
                "cannot build a prompt from an empty conversation".to_string(),
            ));
        };
        let url = format!("{}/{}", self.options.base_url, self.options.model);

        let request = Request {
            inputs: &last.content,
            parameters: Parameters {
                max_new_tokens: self.options.max_tokens,
                temperature: self.options.temperature,
                return_full_text: false,
            },
        };

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref key) = self.options.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = check_status(req.json(&request).send().await?).await?;
        let body = response.text().await?;
        let parsed: Response = serde_json::from_str(&body)
            .map_err(|e| LLMError::MalformedBody(format!("invalid inference response: {e}")))?;

        match parsed.into_text() {
            Some(text) if !text.is_empty() => Ok(ProviderReply::Complete(text)),
            _ => Err(LLMError::MalformedBody(
                "inference response contained no generated text".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

#[derive(Serialize)]
struct Parameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    return_full_text: bool,
}

/// The API answers with either a list of generations or a single one.
#[derive(Deserialize)]
#[serde(untagged)]
enum Response {
    Many(Vec<Generation>),
    One(Generation),
}

#[derive(Deserialize)]
struct Generation {
    generated_text: Option<String>,
}

impl Response {
    fn into_text(self) -> Option<String> {
        match self {
            Response::Many(generations) => generations.into_iter().next()?.generated_text,
            Response::One(generation) => generation.generated_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::serve;

    type Captured = Arc<Mutex<Option<(bool, Value)>>>;

    fn options(base_url: &str) -> ProviderOptions {
        ProviderOptions::new("huggingface", base_url, "microsoft/DialoGPT-medium")
            .anonymous(true)
            .sampling(Some(0.7), Some(500))
    }

    #[test]
    fn parses_both_response_shapes() {
        let many: Response = serde_json::from_value(json!([{"generated_text": "a"}])).unwrap();
        assert_eq!(many.into_text().as_deref(), Some("a"));

        let one: Response = serde_json::from_value(json!({"generated_text": "b"})).unwrap();
        assert_eq!(one.into_text().as_deref(), Some("b"));

        let empty: Response = serde_json::from_value(json!([])).unwrap();
        assert!(empty.into_text().is_none());
    }

    #[tokio::test]
    async fn anonymous_call_sends_last_message_only() {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/microsoft/DialoGPT-medium",
                post(
                    |State(captured): State<Captured>,
                     headers: HeaderMap,
                     Json(body): Json<Value>| async move {
                        let has_auth = headers.contains_key("authorization");
                        *captured.lock().unwrap() = Some((has_auth, body));
                        Json(json!([{"generated_text": "Hi there"}]))
                    },
                ),
            )
            .with_state(captured.clone());
        let base_url = serve(app).await;

        let provider = HuggingFaceProvider::new(Client::new(), options(&base_url));
        assert!(!provider.has_credential());
        assert!(provider.allows_anonymous());

        let reply = provider
            .send(&[Message::user("first"), Message::assistant("ok"), Message::user("Hello")])
            .await
            .unwrap();
        let ProviderReply::Complete(text) = reply else {
            panic!("expected complete reply");
        };
        assert_eq!(text, "Hi there");

        let (has_auth, body) = captured.lock().unwrap().take().unwrap();
        assert!(!has_auth);
        assert_eq!(body["inputs"], "Hello");
        assert_eq!(body["parameters"]["max_new_tokens"], 500);
        assert_eq!(body["parameters"]["return_full_text"], false);
    }

    #[tokio::test]
    async fn missing_generated_text_is_malformed() {
        let app = Router::new().route(
            "/microsoft/DialoGPT-medium",
            post(|| async { Json(json!({"error": "Model is currently loading"})) }),
        );
        let base_url = serve(app).await;

        let err = HuggingFaceProvider::new(Client::new(), options(&base_url))
            .send(&[Message::user("Hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::MalformedBody(_)));
    }
}
