//! Handshake signals sent by the plotter firmware.

use std::fmt;

/// Line the firmware prints once it has booted
pub const READY_LINE: &str = ";Ready;";

/// Line the firmware prints each time it wants one more token
pub const NEXT_LINE: &str = ";next;";

/// One framed line of device output, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeSignal {
    Ready,
    Next,
    /// Anything else: diagnostics the firmware prints while drawing
    Other(String),
}

impl HandshakeSignal {
    /// Classify a line with its terminator already stripped
    ///
    /// Surrounding whitespace is ignored; matching is otherwise exact.
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            READY_LINE => HandshakeSignal::Ready,
            NEXT_LINE => HandshakeSignal::Next,
            _ => HandshakeSignal::Other(line.to_string()),
        }
    }

    pub fn is_handshake(&self) -> bool {
        !matches!(self, HandshakeSignal::Other(_))
    }
}

impl fmt::Display for HandshakeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeSignal::Ready => write!(f, "ready"),
            HandshakeSignal::Next => write!(f, "next"),
            HandshakeSignal::Other(line) => write!(f, "{}", line),
        }
    }
}
