//! Program streamer
//!
//! Drives a [`DeliverySession`] over a [`Transport`]: reads device output,
//! frames it into lines, classifies each line and applies it to the
//! session until the program is delivered, the link fails, the device
//! goes quiet for too long, or the caller cancels.
//!
//! The loop is blocking. [`ProgramStreamer::spawn`] moves it onto the
//! tokio blocking pool and hands back a [`StreamerHandle`] for progress
//! and cancellation.

use crate::framing::{LineFramer, DEFAULT_MAX_LINE_LEN};
use crate::session::{DeliverySession, SessionPhase, SignalOutcome};
use crate::signal::HandshakeSignal;
use crate::transport::{is_idle_read, Transport};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use xyplot_core::ConnectionError;

/// Idle timeout used when none is configured
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

const READ_CHUNK: usize = 256;

/// Streamer tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamerConfig {
    /// Give up when no complete line arrives for this long; `None` waits forever
    pub idle_timeout: Option<Duration>,
    /// Longest unterminated inbound line
    pub max_line_len: usize,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl StreamerConfig {
    /// Build from a millisecond timeout where zero disables it
    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.idle_timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
        self
    }
}

/// Live view of a running delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryProgress {
    pub phase: SessionPhase,
    /// Next token index
    pub cursor: usize,
    pub total: usize,
    pub tokens_sent: usize,
}

impl DeliveryProgress {
    fn from_session(session: &DeliverySession) -> Self {
        Self {
            phase: session.phase(),
            cursor: session.cursor(),
            total: session.program().len(),
            tokens_sent: session.stats().tokens_sent,
        }
    }

    /// Fraction of the program delivered, in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.cursor as f64 / self.total as f64
        }
    }
}

/// Summary of a finished delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub session_id: String,
    pub tokens_sent: usize,
    pub signals_handled: usize,
    pub violations: usize,
    pub pass_through: usize,
    pub elapsed: Duration,
}

/// Runs one delivery session to completion over one transport
pub struct ProgramStreamer<T: Transport> {
    transport: T,
    session: DeliverySession,
    framer: LineFramer,
    config: StreamerConfig,
    progress: Arc<RwLock<DeliveryProgress>>,
    shutdown: Option<mpsc::Receiver<()>>,
}

impl<T: Transport> ProgramStreamer<T> {
    pub fn new(transport: T, session: DeliverySession, config: StreamerConfig) -> Self {
        let progress = Arc::new(RwLock::new(DeliveryProgress::from_session(&session)));
        Self {
            transport,
            session,
            framer: LineFramer::new(config.max_line_len),
            config,
            progress,
            shutdown: None,
        }
    }

    pub fn session(&self) -> &DeliverySession {
        &self.session
    }

    pub fn progress(&self) -> Arc<RwLock<DeliveryProgress>> {
        self.progress.clone()
    }

    /// Give back the transport, e.g. to inspect a test double
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Deliver the program, blocking until it is done or fails
    pub fn run(&mut self) -> Result<DeliveryReport, ConnectionError> {
        let started = Instant::now();
        let mut last_line = Instant::now();
        let mut buf = [0u8; READ_CHUNK];

        tracing::info!(
            session = %self.session.id(),
            port = %self.transport.name(),
            tokens = self.session.program().len(),
            "Waiting for device"
        );

        while !self.session.is_done() {
            if let Some(shutdown) = self.shutdown.as_mut() {
                if shutdown.try_recv().is_ok() {
                    return Err(self.fail(ConnectionError::Cancelled));
                }
            }

            let read = match self.transport.read(&mut buf) {
                Ok(n) => n,
                Err(e) if is_idle_read(&e) => 0,
                Err(e) => {
                    let err = ConnectionError::Io {
                        port: self.transport.name(),
                        reason: e.to_string(),
                    };
                    return Err(self.fail(err));
                }
            };

            if read == 0 {
                if let Some(timeout) = self.config.idle_timeout {
                    if last_line.elapsed() >= timeout {
                        let err = ConnectionError::IdleTimeout {
                            timeout_ms: timeout.as_millis() as u64,
                        };
                        return Err(self.fail(err));
                    }
                }
                continue;
            }

            let lines = match self.framer.push(&buf[..read]) {
                Ok(lines) => lines,
                Err(err) => return Err(self.fail(err)),
            };
            for line in lines {
                last_line = Instant::now();
                let signal = HandshakeSignal::parse(&line);
                let outcome = match self.session.handle_signal(&signal, &mut self.transport) {
                    Ok(outcome) => outcome,
                    Err(err) => return Err(self.fail(err)),
                };
                self.publish();
                if matches!(outcome, SignalOutcome::Completed { .. }) {
                    break;
                }
            }
        }

        self.publish();
        let stats = self.session.stats();
        Ok(DeliveryReport {
            session_id: self.session.id().to_string(),
            tokens_sent: stats.tokens_sent,
            signals_handled: stats.signals_handled,
            violations: stats.violations,
            pass_through: stats.pass_through,
            elapsed: started.elapsed(),
        })
    }

    fn publish(&self) {
        *self.progress.write() = DeliveryProgress::from_session(&self.session);
    }

    fn fail(&mut self, err: ConnectionError) -> ConnectionError {
        self.session.abort(&err.to_string());
        self.publish();
        if let Err(e) = self.transport.close() {
            tracing::debug!("Failed to close {}: {}", self.transport.name(), e);
        }
        err
    }
}

impl<T: Transport + 'static> ProgramStreamer<T> {
    /// Run on the tokio blocking pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        mut self,
    ) -> (
        StreamerHandle,
        JoinHandle<Result<DeliveryReport, ConnectionError>>,
    ) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown = Some(shutdown_rx);
        let handle = StreamerHandle {
            session_id: self.session.id().to_string(),
            progress: self.progress.clone(),
            shutdown: shutdown_tx,
        };
        let task = tokio::task::spawn_blocking(move || self.run());
        (handle, task)
    }
}

/// Progress and cancellation for a spawned streamer
#[derive(Debug, Clone)]
pub struct StreamerHandle {
    session_id: String,
    progress: Arc<RwLock<DeliveryProgress>>,
    shutdown: mpsc::Sender<()>,
}

impl StreamerHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Latest progress snapshot
    pub fn progress(&self) -> DeliveryProgress {
        *self.progress.read()
    }

    /// Ask the run loop to stop; it notices between reads
    pub fn cancel(&self) {
        if self.shutdown.try_send(()).is_err() {
            tracing::debug!(session = %self.session_id, "Streamer already stopping");
        }
    }
}
