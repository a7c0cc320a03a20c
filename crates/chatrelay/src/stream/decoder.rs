//! Incremental parser for the outgoing chunk format.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use super::{DONE_SENTINEL, DeltaEvent, StreamChunk};

/// Line-buffered decoder for `data:` events.
///
/// Bytes may be fed in arbitrary slices; events are only decoded once their
/// line is complete. Everything after the terminal marker is ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal marker has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes and return every chunk completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamChunk> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            if let Some(chunk) = self.decode_line(&line) {
                chunks.push(chunk);
                if self.done {
                    self.buffer.clear();
                    break;
                }
            }
        }
        chunks
    }

    /// Decode a trailing line left without a newline once input has ended.
    pub fn finish(&mut self) -> Option<StreamChunk> {
        if self.done || self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<StreamChunk> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();

        let data = line.strip_prefix("data:")?.trim_start();
        if data == DONE_SENTINEL {
            self.done = true;
            return Some(StreamChunk::Done);
        }

        let event = serde_json::from_str::<DeltaEvent>(data).ok()?;
        let content = event.choices.into_iter().next()?.delta.content?;
        if content.is_empty() {
            return None;
        }
        Some(StreamChunk::Content(content))
    }
}

/// Adapts a byte stream into a stream of decoded chunks.
///
/// Ends after the terminal marker, or when the inner stream ends.
pub struct DecodedStream<S> {
    inner: S,
    decoder: SseDecoder,
    pending: std::collections::VecDeque<StreamChunk>,
    exhausted: bool,
}

impl<S> DecodedStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: SseDecoder::new(),
            pending: std::collections::VecDeque::new(),
            exhausted: false,
        }
    }
}

impl<S, E> Stream for DecodedStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<StreamChunk, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(chunk)));
            }
            if self.exhausted || self.decoder.is_done() {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let chunks = self.decoder.feed(&bytes);
                    self.pending.extend(chunks);
                }
                Poll::Ready(Some(Err(e))) => {
                    self.exhausted = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    self.exhausted = true;
                    if let Some(chunk) = self.decoder.finish() {
                        self.pending.push_back(chunk);
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
