//! Byte transport abstraction
//!
//! The delivery session only needs to push tokens out and pull device
//! output in. Anything that can do that (a serial port, a TCP socket, an
//! in-memory test double) implements [`Transport`].

use std::io;
use xyplot_core::ConnectionError;
use xyplot_designer::Token;

/// Low-level byte link to the plotter
pub trait Transport: Send {
    /// Write data to the link, returning the number of bytes accepted
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read available data
    ///
    /// Returns `Ok(0)`, or an error of kind `TimedOut`/`WouldBlock`, when
    /// nothing arrived within the transport's read timeout.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Human-readable link name for logs and errors
    fn name(&self) -> String;

    /// Close the link
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn name(&self) -> String {
        (**self).name()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Write one token as a single wire unit
///
/// Short writes are continued until the whole token is out. A write that
/// accepts zero bytes is a failure, not a retry.
pub fn send_token<T: Transport + ?Sized>(
    transport: &mut T,
    token: &Token,
) -> Result<(), ConnectionError> {
    let bytes = token.to_wire();
    let mut written = 0;
    while written < bytes.len() {
        match transport.write(&bytes[written..]) {
            Ok(0) => {
                return Err(ConnectionError::Io {
                    port: transport.name(),
                    reason: "write accepted zero bytes".to_string(),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ConnectionError::Io {
                    port: transport.name(),
                    reason: e.to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Whether a read error only means "nothing yet"
pub fn is_idle_read(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
