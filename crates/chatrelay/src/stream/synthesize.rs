//! Materialize-then-split: turn a complete reply into a paced chunk stream.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::time::{Sleep, sleep};

use super::StreamChunk;

/// Emit `text` one character per chunk, `delay` apart, then the terminal marker.
pub fn synthesize(text: impl Into<String>, delay: Duration) -> SynthesizedStream {
    SynthesizedStream::new(text.into(), delay)
}

/// A cooperative, cancellable chunk producer over a complete text.
///
/// The pacing timer lives inside the stream, so dropping the stream (for
/// example when the client disconnects) stops emission and releases it.
pub struct SynthesizedStream {
    text: String,
    position: usize,
    delay: Duration,
    timer: Option<Pin<Box<Sleep>>>,
    finished: bool,
}

impl SynthesizedStream {
    fn new(text: String, delay: Duration) -> Self {
        Self {
            text,
            position: 0,
            delay,
            timer: None,
            finished: false,
        }
    }

    fn arm_timer(&mut self) {
        if !self.delay.is_zero() {
            self.timer = Some(Box::pin(sleep(self.delay)));
        }
    }
}

impl Stream for SynthesizedStream {
    type Item = StreamChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        if let Some(timer) = self.timer.as_mut() {
            if timer.as_mut().poll(cx).is_pending() {
                return Poll::Pending;
            }
            self.timer = None;
        }

        let next = self.text[self.position..].chars().next();
        match next {
            Some(ch) => {
                self.position += ch.len_utf8();
                self.arm_timer();
                Poll::Ready(Some(StreamChunk::Content(ch.to_string())))
            }
            None => {
                self.finished = true;
                self.text = String::new();
                Poll::Ready(Some(StreamChunk::Done))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let remaining = self.text[self.position..].chars().count() + 1;
        (remaining, Some(remaining))
    }
}
