use proptest::prelude::*;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use xyplot_communication::{
    DeliverySession, HandshakeSignal, ProgramStreamer, SessionPhase, SignalOutcome,
    StreamerConfig, Transport,
};
use xyplot_core::{ConnectionError, ReadyPolicy};
use xyplot_designer::{CompiledProgram, GeometryCompiler, ShapeElement};

// Mock transport replaying scripted device output
struct MockTransport {
    inbound: VecDeque<Vec<u8>>,
    sent_data: Arc<Mutex<Vec<String>>>,
    fail_writes: bool,
    read_delay: Duration,
}

impl MockTransport {
    fn new(inbound: &[&str]) -> Self {
        Self {
            inbound: inbound.iter().map(|s| s.as_bytes().to_vec()).collect(),
            sent_data: Arc::new(Mutex::new(Vec::new())),
            fail_writes: false,
            read_delay: Duration::ZERO,
        }
    }

    fn sent(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent_data.clone()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        }
        let s = String::from_utf8_lossy(data).to_string();
        self.sent_data.lock().unwrap().push(s);
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inbound.pop_front() {
            Some(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => {
                std::thread::sleep(self.read_delay);
                Err(io::Error::from(io::ErrorKind::TimedOut))
            }
        }
    }

    fn name(&self) -> String {
        "mock".to_string()
    }
}

fn circle_program() -> CompiledProgram {
    GeometryCompiler::default()
        .compile(&[ShapeElement::new("circle")
            .with_attr("cx", "100")
            .with_attr("cy", "100")
            .with_attr("r", "50")])
        .unwrap()
}

fn rect_and_circle_program() -> CompiledProgram {
    GeometryCompiler::default()
        .compile(&[
            ShapeElement::new("rect")
                .with_attr("width", "100")
                .with_attr("height", "50"),
            ShapeElement::new("circle").with_attr("r", "10"),
        ])
        .unwrap()
}

#[test]
fn test_done_after_exactly_len_nexts() {
    let program = circle_program();
    let len = program.len();
    let mut link = MockTransport::new(&[]);
    let sent = link.sent();
    let mut session = DeliverySession::new(program, ReadyPolicy::Idempotent);

    session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap();
    for k in 1..=len {
        let outcome = session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();
        if k < len {
            assert!(matches!(outcome, SignalOutcome::Sent { .. }));
            assert_eq!(session.phase(), SessionPhase::Sending);
        } else {
            assert!(matches!(outcome, SignalOutcome::Completed { .. }));
        }
    }
    assert_eq!(session.phase(), SessionPhase::Done);

    let writes_before = sent.lock().unwrap().len();
    let outcome = session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();
    assert!(matches!(outcome, SignalOutcome::Ignored(_)));
    assert_eq!(sent.lock().unwrap().len(), writes_before);
    assert_eq!(session.phase(), SessionPhase::Done);

    let sent = sent.lock().unwrap();
    assert_eq!(
        *sent,
        vec!["n", "n", "p", "C", "490;", "490;", "245;", "q", "u"]
    );
}

#[test]
fn test_one_write_per_signal() {
    let mut link = MockTransport::new(&[]);
    let sent = link.sent();
    let mut session = DeliverySession::new(rect_and_circle_program(), ReadyPolicy::Idempotent);

    assert!(sent.lock().unwrap().is_empty());
    session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap();
    for signals in 1..=5 {
        session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();
        assert_eq!(sent.lock().unwrap().len(), signals + 1);
        assert_eq!(session.cursor(), signals);
    }
}

#[test]
fn test_chatter_does_not_move_cursor() {
    let mut link = MockTransport::new(&[]);
    let sent = link.sent();
    let mut session = DeliverySession::new(circle_program(), ReadyPolicy::Idempotent);

    session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap();
    for line in ["x:490 y:490", ";nex", "Ready"] {
        session
            .handle_signal(&HandshakeSignal::parse(line), &mut link)
            .unwrap();
    }
    assert_eq!(session.cursor(), 0);
    assert_eq!(sent.lock().unwrap().len(), 1);
    assert_eq!(session.stats().pass_through, 3);
}

#[test]
fn test_streamer_handles_split_and_joined_lines() {
    let program = circle_program();
    let len = program.len();

    let mut device = String::from(";Ready;\r\n");
    for _ in 0..len {
        device.push_str(";next;\r\n");
    }
    // Chop into awkward chunks that split terminators and signals
    let chunks: Vec<&str> = device
        .as_bytes()
        .chunks(5)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect();
    let link = MockTransport::new(&chunks);
    let sent = link.sent();

    let session = DeliverySession::new(program.clone(), ReadyPolicy::Idempotent);
    let mut streamer = ProgramStreamer::new(link, session, StreamerConfig::default());
    let report = streamer.run().unwrap();

    assert_eq!(report.tokens_sent, len + 1);
    assert_eq!(report.signals_handled, len + 1);
    assert_eq!(report.violations, 0);
    assert_eq!(sent.lock().unwrap().concat(), format!("n{}", program.wire_string()));
}

#[test]
fn test_streamer_write_failure_aborts_without_retry() {
    let mut link = MockTransport::new(&[";Ready;\n", ";next;\n"]);
    link.fail_writes = true;
    let session = DeliverySession::new(circle_program(), ReadyPolicy::Idempotent);
    let mut streamer = ProgramStreamer::new(link, session, StreamerConfig::default());

    let err = streamer.run().unwrap_err();
    assert!(matches!(err, ConnectionError::Io { ref port, .. } if port == "mock"));
    assert_eq!(streamer.session().phase(), SessionPhase::Aborted);
    assert_eq!(streamer.session().stats().tokens_sent, 0);
}

#[test]
fn test_streamer_rejects_runaway_line() {
    let runaway = "x".repeat(64);
    let link = MockTransport::new(&[runaway.as_str()]);
    let session = DeliverySession::new(circle_program(), ReadyPolicy::Idempotent);
    let config = StreamerConfig {
        max_line_len: 16,
        ..StreamerConfig::default()
    };
    let mut streamer = ProgramStreamer::new(link, session, config);
    assert!(matches!(
        streamer.run(),
        Err(ConnectionError::LineTooLong { limit: 16 })
    ));
}

#[test]
fn test_restart_policy_redelivers_from_start() {
    let program = circle_program();
    let len = program.len();
    let mut device = vec![";Ready;\n", ";next;\n", ";next;\n", ";next;\n", ";Ready;\n"];
    for _ in 0..len {
        device.push(";next;\n");
    }
    let link = MockTransport::new(&device);
    let sent = link.sent();

    let session = DeliverySession::new(program.clone(), ReadyPolicy::Restart);
    let mut streamer = ProgramStreamer::new(link, session, StreamerConfig::default());
    streamer.run().unwrap();

    let sent = sent.lock().unwrap();
    let tail: String = sent[4..].concat();
    assert_eq!(&sent[..4].concat(), "nnpC");
    assert_eq!(tail, format!("n{}", program.wire_string()));
}

#[tokio::test]
async fn test_spawned_streamer_completes() {
    let program = rect_and_circle_program();
    let len = program.len();
    let mut device = vec![";Ready;\r\n"];
    for _ in 0..len {
        device.push(";next;\r\n");
    }
    let link = MockTransport::new(&device);
    let session = DeliverySession::new(program, ReadyPolicy::Idempotent);

    let (handle, task) = ProgramStreamer::new(link, session, StreamerConfig::default()).spawn();
    let report = task.await.unwrap().unwrap();

    assert_eq!(report.tokens_sent, len + 1);
    assert_eq!(report.session_id, handle.session_id());
    let progress = handle.progress();
    assert_eq!(progress.phase, SessionPhase::Done);
    assert_eq!(progress.cursor, len);
    assert_eq!(progress.fraction(), 1.0);
}

#[tokio::test]
async fn test_spawned_streamer_can_be_cancelled() {
    let mut link = MockTransport::new(&[";Ready;\n"]);
    link.read_delay = Duration::from_millis(5);
    let session = DeliverySession::new(circle_program(), ReadyPolicy::Idempotent);
    let config = StreamerConfig::default().with_idle_timeout_ms(0);

    let (handle, task) = ProgramStreamer::new(link, session, config).spawn();
    tokio::time::sleep(Duration::from_millis(30)).await;
    handle.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("streamer did not stop")
        .unwrap();
    assert!(matches!(result, Err(ConnectionError::Cancelled)));
    assert_eq!(handle.progress().phase, SessionPhase::Aborted);
}

proptest! {
    #[test]
    fn prop_done_only_after_len_nexts(extra_chatter in prop::collection::vec("[a-z ]{1,12}", 0..8)) {
        let program = circle_program();
        let len = program.len();
        let mut link = MockTransport::new(&[]);
        let mut session = DeliverySession::new(program, ReadyPolicy::Idempotent);

        session.handle_signal(&HandshakeSignal::Ready, &mut link).unwrap();
        for line in &extra_chatter {
            session.handle_signal(&HandshakeSignal::parse(line), &mut link).unwrap();
        }
        for _ in 0..len - 1 {
            session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();
            prop_assert_eq!(session.phase(), SessionPhase::Sending);
        }
        session.handle_signal(&HandshakeSignal::Next, &mut link).unwrap();
        prop_assert_eq!(session.phase(), SessionPhase::Done);
        prop_assert_eq!(link.sent_data.lock().unwrap().len(), len + 1);
    }
}
