//! # XY-Plotter Communication
//!
//! Delivers a compiled token program to the plotter firmware.
//!
//! The firmware pulls: it prints `;Ready;` once booted and `;next;` each
//! time it can take one more token. This crate frames those lines, runs
//! the delivery state machine, and talks to the hardware over serial.

pub mod framing;
pub mod serial;
pub mod session;
pub mod signal;
pub mod streamer;
pub mod transport;

pub use framing::LineFramer;
pub use serial::{
    auto_detect_port, is_valid_port, list_ports, ConnectionParams, RealSerialPort, SerialParity,
    SerialPortInfo,
};
pub use session::{DeliverySession, SessionPhase, SessionStats, SignalOutcome};
pub use signal::HandshakeSignal;
pub use streamer::{
    DeliveryProgress, DeliveryReport, ProgramStreamer, StreamerConfig, StreamerHandle,
};
pub use transport::{send_token, Transport};
