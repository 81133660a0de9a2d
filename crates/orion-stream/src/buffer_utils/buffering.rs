use std::collections::VecDeque;
use std::str::Utf8Error;

/// Accumulation buffer for line-delimited stream bodies.
///
/// Chunks are appended as they arrive; complete lines are drained in order
/// and the trailing fragment waits for the next chunk.
pub struct LineBuffer {
    buffer: VecDeque<u8>,
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line without its terminator (`\n` or `\r\n`).
    /// `None` while only an unterminated fragment remains.
    pub fn next_line(&mut self) -> Option<Result<String, Utf8Error>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;

        let mut line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        line_bytes.pop();
        if line_bytes.last() == Some(&b'\r') {
            line_bytes.pop();
        }

        // Multi-byte characters split across chunks are whole again by now
        Some(std::str::from_utf8(&line_bytes).map(str::to_owned))
    }

    /// Drop the unterminated fragment, returning how many bytes were lost
    pub fn discard_remainder(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
