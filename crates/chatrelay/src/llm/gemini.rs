//! Google Gemini provider using `generateContent`.
//!
//! Gemini answers with one complete body, so the reply is handed to the
//! stream normalizer.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{LLMError, check_status};
use super::provider::{LLMProvider, ProviderOptions, ProviderReply};
use super::types::{Message, Role};

/// Gemini provider with native API format.
pub struct GeminiProvider {
    client: Client,
    options: ProviderOptions,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(client: Client, options: ProviderOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
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
        let url = format!(
            "{}/models/{}:generateContent",
            self.options.base_url, self.options.model
        );
        let request = to_request(messages, &self.options);

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref key) = self.options.api_key {
            req = req.header("x-goog-api-key", key);
        }

        let response = check_status(req.json(&request).send().await?).await?;
        let body = response.text().await?;
        let parsed: Response = serde_json::from_str(&body)
            .map_err(|e| LLMError::MalformedBody(format!("invalid gemini response: {e}")))?;

        from_response(parsed).map(ProviderReply::Complete)
    }
}

// --- Request/Response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Request {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

// --- Conversions ---

fn text_content(role: Option<&str>, text: &str) -> Content {
    Content {
        role: role.map(str::to_string),
        parts: vec![Part {
            text: Some(text.to_string()),
        }],
    }
}

fn to_request(messages: &[Message], options: &ProviderOptions) -> Request {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system_parts.push(msg.content.as_str()),
            Role::User => contents.push(text_content(Some("user"), &msg.content)),
            Role::Assistant => contents.push(text_content(Some("model"), &msg.content)),
        }
    }

    let system_instruction =
        (!system_parts.is_empty()).then(|| text_content(None, &system_parts.join("\n\n")));

    Request {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_tokens,
        },
    }
}

fn from_response(response: Response) -> Result<String, LLMError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(LLMError::MalformedBody(
            "gemini response contained no candidate text".to_string(),
        ));
    }
    Ok(text)
}
