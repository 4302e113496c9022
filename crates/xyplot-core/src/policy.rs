//! Behaviour switches shared by the compiler, the delivery session, and
//! the settings file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a delivery session reacts to `;Ready;` once it has left `Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyPolicy {
    /// Log the signal and leave the cursor where it is; nothing is written
    #[default]
    Idempotent,
    /// Rewind to the start of the program and resend the session marker
    Restart,
}

impl fmt::Display for ReadyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idempotent => write!(f, "idempotent"),
            Self::Restart => write!(f, "restart"),
        }
    }
}

impl FromStr for ReadyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idempotent" | "ignore" => Ok(Self::Idempotent),
            "restart" => Ok(Self::Restart),
            _ => Err(format!("Unknown ready policy: {}", s)),
        }
    }
}

/// Where a rotated ellipse's pivot comes from
///
/// Existing plotter firmware was driven with the ellipse centre as the
/// pivot even when the transform named another point, so that stays the
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotMode {
    /// Always rotate about the ellipse centre
    #[default]
    ShapeCenter,
    /// Use `rotate(angle, ox, oy)` pivots when present, else the centre
    Transform,
}

impl fmt::Display for PivotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeCenter => write!(f, "shape_center"),
            Self::Transform => write!(f, "transform"),
        }
    }
}

impl FromStr for PivotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "shape_center" | "center" => Ok(Self::ShapeCenter),
            "transform" => Ok(Self::Transform),
            _ => Err(format!("Unknown pivot mode: {}", s)),
        }
    }
}
