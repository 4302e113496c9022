//! Error handling for xyplot
//!
//! Provides error types for every layer of the plotter pipeline:
//! - Geometry errors (malformed shape input, raised while compiling)
//! - Protocol violations (unexpected handshake signals, logged and tolerated)
//! - Connection errors (transport failures, fatal to a delivery session)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Raised synchronously by the shape encoders and the path decomposer.
/// A geometry error aborts the whole compile call; no partial program
/// is ever returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A required attribute is absent from the element
    #[error("<{kind}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        /// The element kind.
        kind: String,
        /// The missing attribute name.
        attribute: String,
    },

    /// An attribute could not be parsed as a finite number
    #[error("<{kind}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        /// The element kind.
        kind: String,
        /// The attribute name.
        attribute: String,
        /// The raw attribute value.
        value: String,
    },

    /// Polygon with fewer than three vertices
    #[error("Polygon needs at least 3 points, got {count}")]
    TooFewPoints {
        /// Number of points supplied.
        count: usize,
    },

    /// Point list with an odd number of coordinates
    #[error("Point list has an odd number of coordinates ({count})")]
    UnpairedCoordinate {
        /// Number of coordinates supplied.
        count: usize,
    },

    /// Path coordinate count does not describe a whole curve chain
    #[error("Path has {count} coordinates; a curve chain needs 14 + 8k")]
    PathCoordinateCount {
        /// Number of coordinates found in the path data.
        count: usize,
    },

    /// A rotate transform that could not be parsed
    #[error("Invalid rotate transform '{transform}'")]
    InvalidTransform {
        /// The raw transform attribute.
        transform: String,
    },

    /// Error attributed to a specific element of the input list
    #[error("element {index}: {source}")]
    AtElement {
        /// Position of the element in the input list.
        index: usize,
        /// The underlying geometry error.
        #[source]
        source: Box<GeometryError>,
    },
}

impl GeometryError {
    /// Attach the index of the offending element
    pub fn at_element(self, index: usize) -> Self {
        match self {
            already @ GeometryError::AtElement { .. } => already,
            other => GeometryError::AtElement {
                index,
                source: Box::new(other),
            },
        }
    }

    /// Strip any element attribution and return the underlying error
    pub fn root(&self) -> &GeometryError {
        match self {
            GeometryError::AtElement { source, .. } => source.root(),
            other => other,
        }
    }
}

/// A handshake signal that arrived in a phase where it has no meaning
///
/// Violations never change session state. They are logged and counted,
/// so stray device chatter cannot desynchronise the cursor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unexpected '{signal}' signal while {phase}")]
pub struct ProtocolViolation {
    /// The signal that was received.
    pub signal: String,
    /// The session phase at the time.
    pub phase: String,
}

/// Connection error type
///
/// Represents failures of the byte link to the plotter. Any of these
/// aborts the delivery session and is surfaced to the caller; nothing
/// is retried internally.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// No usable port could be found
    #[error("Port not found: {port}")]
    PortNotFound {
        /// The requested port or search description.
        port: String,
    },

    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Invalid connection parameters
    #[error("Invalid connection parameters: {reason}")]
    InvalidParameters {
        /// The reason the parameters are invalid.
        reason: String,
    },

    /// Reading from or writing to the transport failed
    #[error("I/O error on {port}: {reason}")]
    Io {
        /// Transport name.
        port: String,
        /// The underlying error message.
        reason: String,
    },

    /// Inbound bytes never produced a line terminator
    #[error("Unterminated inbound line exceeded {limit} bytes")]
    LineTooLong {
        /// The configured maximum line length.
        limit: usize,
    },

    /// No handshake signal arrived in time
    #[error("No signal from device for {timeout_ms}ms")]
    IdleTimeout {
        /// The idle timeout in milliseconds.
        timeout_ms: u64,
    },

    /// Delivery was cancelled by the caller
    #[error("Delivery cancelled")]
    Cancelled,

    /// The session already aborted and cannot accept further signals
    #[error("Session {session} has been aborted")]
    SessionAborted {
        /// Session identifier.
        session: String,
    },
}

/// Main error type for xyplot
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Protocol violation escalated by the caller
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Connection(ConnectionError::IdleTimeout { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
