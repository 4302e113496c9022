//! # xyplot Core
//!
//! Core types and utilities shared by every xyplot crate: the error
//! taxonomy, millimetre-to-step conversion, and the behaviour policies
//! that the compiler and the delivery session are configured with.

pub mod error;
pub mod policy;
pub mod units;

pub use error::{ConnectionError, Error, GeometryError, ProtocolViolation, Result};
pub use policy::{PivotMode, ReadyPolicy};
pub use units::{to_steps, StepConverter};
