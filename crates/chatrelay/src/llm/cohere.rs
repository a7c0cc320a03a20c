//! Cohere provider using the `v1/chat` endpoint.
//!
//! Cohere takes a single `message` plus optional `chat_history`, and streams
//! newline-delimited JSON events that are transcoded into outgoing chunks.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{LLMError, check_status};
use super::provider::{LLMProvider, ProviderOptions, ProviderReply};
use super::types::{Message, Role};
use crate::stream::StreamChunk;

/// Cohere provider with a transcoded stream.
pub struct CohereProvider {
    client: Client,
    options: ProviderOptions,
}

impl CohereProvider {
    #[must_use]
    pub fn new(client: Client, options: ProviderOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl LLMProvider for CohereProvider {
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
        let Some(request) = to_request(messages, &self.options) else {
            return Err(LLMError::MalformedBody(
                "cannot build a cohere request from an empty conversation".to_string(),
            ));
        };
        let url = format!("{}/chat", self.options.base_url);

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref key) = self.options.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = check_status(req.json(&request).send().await?).await?;
        let event_stream = StreamParser::new(Box::pin(response.bytes_stream()));

        Ok(ProviderReply::Chunks(Box::pin(event_stream)))
    }
}

// --- Request types ---

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chat_history: Vec<HistoryEntry<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct HistoryEntry<'a> {
    role: &'static str,
    message: &'a str,
}

fn to_request<'a>(messages: &'a [Message], options: &'a ProviderOptions) -> Option<Request<'a>> {
    let (last, history) = messages.split_last()?;

    let chat_history = history
        .iter()
        .map(|msg| HistoryEntry {
            role: match msg.role {
                Role::System => "SYSTEM",
                Role::User => "USER",
                Role::Assistant => "CHATBOT",
            },
            message: &msg.content,
        })
        .collect();

    Some(Request {
        model: &options.model,
        message: &last.content,
        chat_history,
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        stream: true,
    })
}

// --- Streaming ---

/// Transcodes Cohere's NDJSON events into outgoing chunks.
///
/// Each `text-generation` event becomes one content chunk; `stream-end`
/// becomes the terminal marker. A terminal marker is synthesized if the
/// body ends without one.
struct StreamParser<S> {
    inner: S,
    buffer: Vec<u8>,
    eof: bool,
    done: bool,
}

impl<S> StreamParser<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            eof: false,
            done: false,
        }
    }

    /// Decode one line; `Some` when it yields a chunk.
    fn parse_line(&mut self, line: &[u8]) -> Option<StreamChunk> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<StreamEvent>(line) {
            Ok(StreamEvent::TextGeneration { text }) if !text.is_empty() => {
                Some(StreamChunk::Content(text))
            }
            Ok(StreamEvent::StreamEnd { finish_reason }) => {
                if let Some(reason) = finish_reason.filter(|r| r != "COMPLETE") {
                    warn!(finish_reason = %reason, "Cohere stream ended early");
                }
                self.done = true;
                Some(StreamChunk::Done)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable Cohere stream event");
                None
            }
        }
    }
}

impl<S> Stream for StreamParser<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    type Item = Result<StreamChunk, LLMError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        loop {
            if let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
                if let Some(chunk) = self.parse_line(&line) {
                    return Poll::Ready(Some(Ok(chunk)));
                }
                continue;
            }

            if self.eof {
                self.done = true;
                return Poll::Ready(Some(Ok(StreamChunk::Done)));
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    self.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(LLMError::Request(e))));
                }
                Poll::Ready(None) => {
                    self.eof = true;
                    let rest = std::mem::take(&mut self.buffer);
                    if let Some(chunk) = self.parse_line(&rest) {
                        return Poll::Ready(Some(Ok(chunk)));
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "event_type", rename_all = "kebab-case")]
enum StreamEvent {
    TextGeneration {
        text: String,
    },
    StreamEnd {
        #[serde(default)]
        finish_reason: Option<String>,
    },
    #[serde(other)]
    Other,
}
