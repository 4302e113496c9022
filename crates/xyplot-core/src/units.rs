//! Unit conversion utilities
//!
//! Converts physical lengths (millimetres) into stepper-motor step counts.
//! Each axis is a belt driven by a pulley on a stepper motor, so one step
//! moves the pen by `step_angle × pulley_radius` millimetres.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Default full-step angle of the axis motors, in degrees
pub const DEFAULT_STEP_ANGLE_DEG: f64 = 1.8;

/// Default pulley diameter, in millimetres
pub const DEFAULT_PULLEY_DIAMETER_MM: f64 = 13.0;

/// Converts millimetre lengths into integer step counts
///
/// Rounding is to the nearest integer with ties away from zero
/// (`f64::round`). Negative lengths yield negative step counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepConverter {
    step_angle_deg: f64,
    pulley_diameter_mm: f64,
}

impl Default for StepConverter {
    fn default() -> Self {
        Self {
            step_angle_deg: DEFAULT_STEP_ANGLE_DEG,
            pulley_diameter_mm: DEFAULT_PULLEY_DIAMETER_MM,
        }
    }
}

impl StepConverter {
    /// Create a converter for the given motor step angle and pulley diameter
    pub fn new(step_angle_deg: f64, pulley_diameter_mm: f64) -> Result<Self> {
        if !(step_angle_deg.is_finite() && step_angle_deg > 0.0) {
            return Err(Error::other(format!(
                "Step angle must be a positive number of degrees, got {}",
                step_angle_deg
            )));
        }
        if !(pulley_diameter_mm.is_finite() && pulley_diameter_mm > 0.0) {
            return Err(Error::other(format!(
                "Pulley diameter must be a positive length, got {}",
                pulley_diameter_mm
            )));
        }
        Ok(Self {
            step_angle_deg,
            pulley_diameter_mm,
        })
    }

    /// Motor step angle in degrees
    pub fn step_angle_deg(&self) -> f64 {
        self.step_angle_deg
    }

    /// Pulley diameter in millimetres
    pub fn pulley_diameter_mm(&self) -> f64 {
        self.pulley_diameter_mm
    }

    /// Linear travel of one motor step, in millimetres
    pub fn mm_per_step(&self) -> f64 {
        (self.step_angle_deg * PI / 180.0) * (self.pulley_diameter_mm / 2.0)
    }

    /// Convert a length in millimetres to a step count
    pub fn to_steps(&self, length_mm: f64) -> i64 {
        round_steps(length_mm / self.mm_per_step())
    }
}

/// Round a fractional step count, ties away from zero
fn round_steps(steps: f64) -> i64 {
    steps.round() as i64
}

impl fmt::Display for StepConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}° step, {} mm pulley ({:.4} mm/step)",
            self.step_angle_deg,
            self.pulley_diameter_mm,
            self.mm_per_step()
        )
    }
}

/// Convert a length in millimetres to steps using the default mechanics
pub fn to_steps(length_mm: f64) -> i64 {
    StepConverter::default().to_steps(length_mm)
}
