//! HTTP client for the chat endpoint.
//!
//! Reads the chunked reply incrementally, the same way a browser client
//! appends deltas to the in-progress assistant message.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::llm::Message;
use crate::response::ErrorBody;
use crate::stream::{DecodedStream, StreamChunk};

/// Decoded reply chunks, ending with [`StreamChunk::Done`] on a complete reply.
pub type ClientStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ClientError>> + Send>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("chat request failed (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("reply ended before the terminal marker")]
    Incomplete,
}

pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// POST the conversation and return the reply as it arrives.
    pub async fn send(&self, messages: &[Message]) -> Result<ClientStream, ClientError> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SendRequest { messages })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(ClientError::Status { status, message });
        }

        let chunks = DecodedStream::new(Box::pin(response.bytes_stream()))
            .map(|chunk| chunk.map_err(ClientError::from));
        Ok(Box::pin(chunks))
    }

    /// Send the conversation and wait for the complete assistant reply.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, ClientError> {
        let stream = self.send(messages).await?;
        collect_reply(stream).await
    }
}

/// Concatenate streamed content until the terminal marker.
pub async fn collect_reply(mut stream: ClientStream) -> Result<String, ClientError> {
    let mut reply = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Content(text) => reply.push_str(&text),
            StreamChunk::Done => return Ok(reply),
        }
    }
    Err(ClientError::Incomplete)
}

#[derive(Serialize)]
struct SendRequest<'a> {
    messages: &'a [Message],
}
