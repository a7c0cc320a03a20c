//! LLM provider trait and reply shapes.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::LLMError;
use super::types::Message;
use crate::stream::{ByteStream, ChunkStream};

/// What a provider handed back on success.
pub enum ProviderReply {
    /// Upstream body already in the outgoing chunk format.
    Passthrough(ByteStream),
    /// Upstream native stream, transcoded into outgoing chunks.
    Chunks(ChunkStream),
    /// A single complete text that still needs to be streamed.
    Complete(String),
}

impl ProviderReply {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderReply::Passthrough(_) => "passthrough",
            ProviderReply::Chunks(_) => "transcoded",
            ProviderReply::Complete(_) => "complete",
        }
    }
}

impl fmt::Debug for ProviderReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderReply::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// Connection and sampling settings shared by every adapter.
#[derive(Clone)]
pub struct ProviderOptions {
    pub id: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub anonymous: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ProviderOptions {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            anonymous: false,
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    #[must_use]
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    #[must_use]
    pub fn sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("anonymous", &self.anonymous)
            .finish_non_exhaustive()
    }
}

/// Adapter for one upstream chat-completion API.
///
/// Each call to [`LLMProvider::send`] performs exactly one outbound request.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Stable identifier used in logs and attempt records.
    fn id(&self) -> &str;

    /// Whether the credential this provider needs is configured.
    fn has_credential(&self) -> bool;

    /// Providers with a free tier may be called without a credential.
    fn allows_anonymous(&self) -> bool {
        false
    }

    /// Send the conversation upstream.
    async fn send(&self, messages: &[Message]) -> Result<ProviderReply, LLMError>;
}

/// Wire protocol spoken by an upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible `/chat/completions` (OpenAI, Groq, ...)
    OpenAI,
    /// Google Gemini `generateContent`
    Gemini,
    /// Cohere `v1/chat`
    Cohere,
    /// Hugging Face Inference API
    HuggingFace,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Cohere => "cohere",
            ProviderKind::HuggingFace => "huggingface",
        };
        f.write_str(name)
    }
}
