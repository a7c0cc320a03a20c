//! Outgoing chunk format and the stream normalizer.
//!
//! Every reply leaves the relay as newline-delimited server-sent events in
//! the OpenAI delta shape, terminated by a literal `[DONE]` event:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hi"}}]}
//!
//! data: [DONE]
//!
//! ```

mod decoder;
mod synthesize;

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::llm::{LLMError, ProviderReply};

pub use decoder::{DecodedStream, SseDecoder};
pub use synthesize::{SynthesizedStream, synthesize};

/// Stream of wire-format bytes ready to be written to the client.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LLMError>> + Send>>;

/// Stream of decoded chunks produced by a transcoding adapter.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LLMError>> + Send>>;

/// Payload of the terminal marker event.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One unit of streamed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// A piece of assistant text.
    Content(String),
    /// End of stream. Emitted once, after all content.
    Done,
}

impl StreamChunk {
    /// Encode as one `data:` event.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            StreamChunk::Content(text) => {
                let event = DeltaEvent {
                    choices: vec![DeltaChoice {
                        delta: Delta {
                            content: Some(text.clone()),
                        },
                    }],
                };
                let json = serde_json::to_string(&event)
                    .unwrap_or_else(|_| r#"{"choices":[{"delta":{}}]}"#.to_string());
                Bytes::from(format!("data: {json}\n\n"))
            }
            StreamChunk::Done => Bytes::from(format!("data: {DONE_SENTINEL}\n\n")),
        }
    }
}

/// Encode a chunk stream into wire bytes, preserving order and boundaries.
pub fn encode(chunks: ChunkStream) -> ByteStream {
    Box::pin(chunks.map(|chunk| chunk.map(|c| c.to_bytes())))
}

/// Turn any provider reply into outgoing wire bytes.
///
/// Passthrough bodies are forwarded untouched, transcoded chunks are encoded
/// one-to-one, and complete text is split into paced single-character chunks.
pub fn normalize(reply: ProviderReply, chunk_delay: Duration) -> ByteStream {
    match reply {
        ProviderReply::Passthrough(bytes) => bytes,
        ProviderReply::Chunks(chunks) => encode(chunks),
        ProviderReply::Complete(text) => encode(Box::pin(
            synthesize(text, chunk_delay).map(Ok::<_, LLMError>),
        )),
    }
}

// --- Wire event shape ---

#[derive(Serialize, Deserialize)]
pub(crate) struct DeltaEvent {
    pub choices: Vec<DeltaChoice>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct DeltaChoice {
    #[serde(default)]
    pub delta: Delta,
}

#[derive(Default, Serialize, Deserialize)]
pub(crate) struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_chunk_encoding() {
        let bytes = StreamChunk::Content("H".to_string()).to_bytes();
        assert_eq!(
            &bytes[..],
            b"data: {\"choices\":[{\"delta\":{\"content\":\"H\"}}]}\n\n"
        );
    }

    #[test]
    fn test_done_encoding() {
        assert_eq!(&StreamChunk::Done.to_bytes()[..], b"data: [DONE]\n\n");
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let bytes = StreamChunk::Content("\"\\\n".to_string()).to_bytes();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert_eq!(
            text,
            "data: {\"choices\":[{\"delta\":{\"content\":\"\\\"\\\\\\n\"}}]}\n\n"
        );

        let mut decoder = SseDecoder::new();
        assert_eq!(
            decoder.feed(&bytes),
            vec![StreamChunk::Content("\"\\\n".to_string())]
        );
    }

    async fn decode_all(stream: ByteStream) -> Vec<StreamChunk> {
        let mut decoder = SseDecoder::new();
        let mut chunks = Vec::new();
        let parts: Vec<Bytes> = stream.map(|b| b.unwrap()).collect().await;
        for part in parts {
            chunks.extend(decoder.feed(&part));
        }
        chunks
    }

    #[tokio::test]
    async fn test_normalize_complete_text() {
        let chunks = decode_all(normalize(
            ProviderReply::Complete("Hi!".to_string()),
            Duration::ZERO,
        ))
        .await;
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Content("H".to_string()),
                StreamChunk::Content("i".to_string()),
                StreamChunk::Content("!".to_string()),
                StreamChunk::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_normalize_passthrough_is_untouched() {
        let raw = Bytes::from_static(b"data: anything goes\n\n");
        let reply = ProviderReply::Passthrough(Box::pin(futures::stream::iter(vec![Ok::<_, LLMError>(
            raw.clone(),
        )])));
        let parts: Vec<Bytes> = normalize(reply, Duration::ZERO)
            .map(|b| b.unwrap())
            .collect()
            .await;
        assert_eq!(parts, vec![raw]);
    }

    #[tokio::test]
    async fn test_encode_preserves_order() {
        let chunks: ChunkStream = Box::pin(futures::stream::iter(vec![
            Ok::<_, LLMError>(StreamChunk::Content("a".to_string())),
            Ok(StreamChunk::Content("b".to_string())),
            Ok(StreamChunk::Done),
        ]));

        let encoded: Vec<Bytes> = encode(chunks)
            .map(|b| b.unwrap())
            .collect::<Vec<_>>()
            .await;

        assert_eq!(encoded.len(), 3);
        assert!(encoded[0].ends_with(b"\"a\"}}]}\n\n"));
        assert!(encoded[1].ends_with(b"\"b\"}}]}\n\n"));
        assert_eq!(&encoded[2][..], b"data: [DONE]\n\n");
    }
}
