//! Pull-based delivery session
//!
//! The plotter has almost no input buffer, so it asks for the program one
//! token at a time. A [`DeliverySession`] answers those requests: every
//! accepted handshake signal writes exactly one token, and nothing is ever
//! written ahead of a request.
//!
//! ```text
//!          Ready                 next (cursor == len)
//!   Idle ────────▶ Sending ──────────────────────────▶ Done
//!     │               │  ▲                              │
//!     │               └──┘ next                         │
//!     └───────────────┴──────── write failure ──────────┴──▶ Aborted
//! ```

use crate::signal::HandshakeSignal;
use crate::transport::{send_token, Transport};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use xyplot_core::{ConnectionError, ProtocolViolation, ReadyPolicy};
use xyplot_designer::{CompiledProgram, Token};

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the device to boot
    Idle,
    /// Answering token requests
    Sending,
    /// Every token has been delivered
    Done,
    /// The link failed or the caller gave up
    Aborted,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Sending => write!(f, "sending"),
            SessionPhase::Done => write!(f, "done"),
            SessionPhase::Aborted => write!(f, "aborted"),
        }
    }
}

/// What a single signal did to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    /// One token was written
    Sent { index: usize, token: Token },
    /// The final token was written; the session is done
    Completed { index: usize, token: Token },
    /// A repeated `Ready` was acknowledged without writing
    Reacknowledged,
    /// A repeated `Ready` restarted delivery from the first token
    Restarted { token: Token },
    /// The signal made no sense in the current phase
    Ignored(ProtocolViolation),
    /// A non-handshake line from the device
    PassThrough(String),
}

/// Counters kept over the life of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub tokens_sent: usize,
    pub signals_handled: usize,
    pub violations: usize,
    pub pass_through: usize,
}

/// Delivery state for one compiled program over one transport
#[derive(Debug, Clone)]
pub struct DeliverySession {
    id: Uuid,
    program: Arc<CompiledProgram>,
    cursor: usize,
    phase: SessionPhase,
    ready_policy: ReadyPolicy,
    stats: SessionStats,
}

impl DeliverySession {
    /// Start a session in `Idle`
    ///
    /// An empty program has nothing to deliver and starts out `Done`.
    pub fn new(program: impl Into<Arc<CompiledProgram>>, ready_policy: ReadyPolicy) -> Self {
        let program = program.into();
        let phase = if program.is_empty() {
            SessionPhase::Done
        } else {
            SessionPhase::Idle
        };
        let id = Uuid::new_v4();
        tracing::info!(session = %id, tokens = program.len(), policy = %ready_policy, "Created delivery session");
        Self {
            id,
            program,
            cursor: 0,
            phase,
            ready_policy,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Index of the token the next `next` signal will send
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn program(&self) -> &CompiledProgram {
        &self.program
    }

    pub fn ready_policy(&self) -> ReadyPolicy {
        self.ready_policy
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn is_done(&self) -> bool {
        self.phase == SessionPhase::Done
    }

    /// Abort the session; later signals are rejected
    pub fn abort(&mut self, reason: &str) {
        if self.phase != SessionPhase::Aborted {
            tracing::error!(session = %self.id, cursor = self.cursor, phase = %self.phase, "Session aborted: {}", reason);
            self.phase = SessionPhase::Aborted;
        }
    }

    /// Apply one inbound signal, writing at most one token
    pub fn handle_signal<T: Transport + ?Sized>(
        &mut self,
        signal: &HandshakeSignal,
        transport: &mut T,
    ) -> Result<SignalOutcome, ConnectionError> {
        if self.phase == SessionPhase::Aborted {
            return Err(ConnectionError::SessionAborted {
                session: self.id.to_string(),
            });
        }

        let outcome = match (signal, self.phase) {
            (HandshakeSignal::Other(line), _) => {
                tracing::info!(session = %self.id, "Device: {}", line);
                self.stats.pass_through += 1;
                return Ok(SignalOutcome::PassThrough(line.clone()));
            }

            (HandshakeSignal::Ready, SessionPhase::Idle) => {
                // The first token goes out on Ready without advancing; the
                // first `next` repeats it
                let token = self.write_at(0, transport)?;
                self.phase = SessionPhase::Sending;
                tracing::info!(session = %self.id, "Device ready, delivery started");
                SignalOutcome::Sent { index: 0, token }
            }

            (HandshakeSignal::Ready, _) => match self.ready_policy {
                ReadyPolicy::Idempotent => {
                    tracing::info!(session = %self.id, phase = %self.phase, "Repeated ready acknowledged");
                    SignalOutcome::Reacknowledged
                }
                ReadyPolicy::Restart => {
                    let token = self.write_at(0, transport)?;
                    self.cursor = 0;
                    self.phase = SessionPhase::Sending;
                    tracing::warn!(session = %self.id, "Device restarted, delivery restarted from the first token");
                    SignalOutcome::Restarted { token }
                }
            },

            (HandshakeSignal::Next, SessionPhase::Sending) => {
                let index = self.cursor;
                let token = self.write_at(index, transport)?;
                self.cursor += 1;
                if self.cursor == self.program.len() {
                    self.phase = SessionPhase::Done;
                    tracing::info!(session = %self.id, tokens = self.stats.tokens_sent, "Delivery complete");
                    SignalOutcome::Completed { index, token }
                } else {
                    SignalOutcome::Sent { index, token }
                }
            }

            (HandshakeSignal::Next, phase) => {
                let violation = ProtocolViolation {
                    signal: signal.to_string(),
                    phase: phase.to_string(),
                };
                tracing::warn!(session = %self.id, "{}", violation);
                self.stats.violations += 1;
                SignalOutcome::Ignored(violation)
            }
        };

        self.stats.signals_handled += 1;
        Ok(outcome)
    }

    fn write_at<T: Transport + ?Sized>(
        &mut self,
        index: usize,
        transport: &mut T,
    ) -> Result<Token, ConnectionError> {
        let Some(token) = self.program.get(index).copied() else {
            let err = ConnectionError::Io {
                port: transport.name(),
                reason: format!("token index {} past end of program", index),
            };
            self.abort(&err.to_string());
            return Err(err);
        };

        if let Err(err) = send_token(transport, &token) {
            self.abort(&err.to_string());
            return Err(err);
        }
        self.stats.tokens_sent += 1;
        tracing::debug!(session = %self.id, index, token = %token, "Sent token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use xyplot_designer::{GeometryCompiler, ShapeElement};

    #[derive(Default)]
    struct Recorder {
        writes: Vec<Vec<u8>>,
        fail: bool,
    }

    impl Transport for Recorder {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.writes.push(data.to_vec());
            Ok(data.len())
        }

        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn name(&self) -> String {
            "recorder".to_string()
        }
    }

    fn program() -> CompiledProgram {
        GeometryCompiler::default()
            .compile(&[ShapeElement::new("circle")
                .with_attr("cx", "100")
                .with_attr("cy", "100")
                .with_attr("r", "50")])
            .unwrap()
    }

    #[test]
    fn test_ready_sends_first_token_without_advancing() {
        let mut link = Recorder::default();
        let mut session = DeliverySession::new(program(), ReadyPolicy::Idempotent);
        assert_eq!(session.phase(), SessionPhase::Idle);

        let outcome = session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap();
        assert_eq!(
            outcome,
            SignalOutcome::Sent {
                index: 0,
                token: Token::SessionStart
            }
        );
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.phase(), SessionPhase::Sending);
        assert_eq!(link.writes, vec![b"n".to_vec()]);
    }

    #[test]
    fn test_next_before_ready_is_ignored() {
        let mut link = Recorder::default();
        let mut session = DeliverySession::new(program(), ReadyPolicy::Idempotent);
        let outcome = session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();
        assert!(matches!(outcome, SignalOutcome::Ignored(_)));
        assert!(link.writes.is_empty());
        assert_eq!(session.stats().violations, 1);
    }

    #[test]
    fn test_repeated_ready_idempotent() {
        let mut link = Recorder::default();
        let mut session = DeliverySession::new(program(), ReadyPolicy::Idempotent);
        session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap();
        session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();
        session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();

        let outcome = session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap();
        assert_eq!(outcome, SignalOutcome::Reacknowledged);
        assert_eq!(session.cursor(), 2);
        assert_eq!(link.writes.len(), 3);
    }

    #[test]
    fn test_repeated_ready_restart() {
        let mut link = Recorder::default();
        let mut session = DeliverySession::new(program(), ReadyPolicy::Restart);
        session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap();
        session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();
        session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();

        let outcome = session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap();
        assert_eq!(
            outcome,
            SignalOutcome::Restarted {
                token: Token::SessionStart
            }
        );
        assert_eq!(session.cursor(), 0);
        assert_eq!(link.writes.last(), Some(&b"n".to_vec()));
    }

    #[test]
    fn test_write_failure_aborts() {
        let mut link = Recorder {
            fail: true,
            ..Default::default()
        };
        let mut session = DeliverySession::new(program(), ReadyPolicy::Idempotent);
        let err = session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap_err();
        assert!(matches!(err, ConnectionError::Io { .. }));
        assert_eq!(session.phase(), SessionPhase::Aborted);

        link.fail = false;
        let err = session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap_err();
        assert!(matches!(err, ConnectionError::SessionAborted { .. }));
        assert!(link.writes.is_empty());
    }

    #[test]
    fn test_pass_through_has_no_effect() {
        let mut link = Recorder::default();
        let mut session = DeliverySession::new(program(), ReadyPolicy::Idempotent);
        let outcome = session
            .handle_signal(&HandshakeSignal::Other("x=3".to_string()), &mut link)
            .unwrap();
        assert_eq!(outcome, SignalOutcome::PassThrough("x=3".to_string()));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.stats().pass_through, 1);
    }

    #[test]
    fn test_empty_program_starts_done() {
        let session = DeliverySession::new(CompiledProgram::default(), ReadyPolicy::Idempotent);
        assert!(session.is_done());
    }
}
