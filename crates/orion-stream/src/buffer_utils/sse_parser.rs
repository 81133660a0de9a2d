use futures::{Stream, StreamExt};
use orion_types::{Delta, StreamFrame};
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;

use super::buffering::LineBuffer;
use crate::error::{ChatError, DecodeSkip};

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_MARKER: &str = "[DONE]";

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<StreamFrame, ChatError>> + Send>>;
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta, ChatError>> + Send>>;

/// Strategy for turning frame payloads into deltas
pub trait FrameDecoder: Send + Sync {
    /// Decode one payload. `Err(DecodeSkip)` drops the frame without failing the stream.
    fn decode_payload(&self, payload: &str) -> Result<Vec<Delta>, DecodeSkip>;

    /// Check if this payload signals end of stream
    fn is_done_marker(&self, payload: &str) -> bool {
        payload == DONE_MARKER
    }
}

/// Extract a frame from one complete line, if it carries the data prefix
pub fn frame_from_line(line: &str) -> Option<StreamFrame> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        return None;
    }
    Some(StreamFrame::new(payload))
}

/// Split a chunked body into frames.
///
/// Lines without the data prefix are dropped. A read error ends the stream
/// with `ChatError::Transport`; an unterminated trailing line is discarded.
pub fn read_frames<S, B, E>(chunks: S, capacity: usize) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(chunks);
        let mut buffer = LineBuffer::with_capacity(capacity);

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(line_result) = buffer.next_line() {
                        match line_result {
                            Ok(line) => {
                                if let Some(frame) = frame_from_line(&line) {
                                    yield Ok(frame);
                                }
                            }
                            Err(e) => tracing::warn!("Dropping non UTF-8 line: {}", e),
                        }
                    }
                }
                Err(e) => {
                    yield Err(ChatError::Transport(e.to_string()));
                    break;
                }
            }
        }

        let dropped = buffer.discard_remainder();
        if dropped > 0 {
            tracing::debug!("Discarded {} bytes of unterminated line", dropped);
        }
    })
}

/// Decode one frame, absorbing malformed payloads
pub fn decode_frame<D: FrameDecoder + ?Sized>(decoder: &D, frame: &StreamFrame) -> Vec<Delta> {
    if decoder.is_done_marker(&frame.payload) {
        return vec![Delta::EndOfStream];
    }

    match decoder.decode_payload(&frame.payload) {
        Ok(deltas) => deltas,
        Err(skip) => {
            tracing::warn!(payload = %frame.payload, "Skipping frame: {}", skip);
            Vec::new()
        }
    }
}

/// Map frames to deltas. The sequence ends after `EndOfStream` or a transport fault.
pub fn decode_stream(mut frames: FrameStream, decoder: Arc<dyn FrameDecoder>) -> DeltaStream {
    Box::pin(async_stream::stream! {
        let mut finished = false;
        while let Some(frame_result) = frames.next().await {
            match frame_result {
                Ok(frame) => {
                    for delta in decode_frame(decoder.as_ref(), &frame) {
                        finished = delta == Delta::EndOfStream;
                        yield Ok(delta);
                        if finished {
                            break;
                        }
                    }
                    if finished {
                        break;
                    }
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    })
}
