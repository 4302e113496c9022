//! Inbound line framing.
//!
//! Device output arrives as arbitrary byte chunks. The framer buffers them
//! and yields complete lines split on `\r` or `\n`, with the terminator
//! removed. Empty lines, such as the gap inside `\r\n`, are dropped.

use xyplot_core::ConnectionError;

/// Longest unterminated line accepted by default
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

#[derive(Debug, Clone)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line_len: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

impl LineFramer {
    pub fn new(max_line_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_len,
        }
    }

    /// Bytes held back waiting for a terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk and collect every line it completes
    ///
    /// Lines are decoded lossily; invalid UTF-8 never fails framing. An
    /// unterminated run longer than the limit is an error and the buffer
    /// is cleared.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, ConnectionError> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\r' || byte == b'\n' {
                if !self.buffer.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.buffer).into_owned());
                    self.buffer.clear();
                }
            } else {
                if self.buffer.len() >= self.max_line_len {
                    self.buffer.clear();
                    return Err(ConnectionError::LineTooLong {
                        limit: self.max_line_len,
                    });
                }
                self.buffer.push(byte);
            }
        }
        Ok(lines)
    }
}
