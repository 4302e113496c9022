//! # xyplot
//!
//! Drives a two-axis XY pen plotter from SVG drawings:
//! - Compiles SVG shapes into the firmware's compact token stream
//! - Delivers that stream over serial, one token per device request
//!
//! ## Architecture
//!
//! xyplot is organized as a workspace with multiple crates:
//!
//! 1. **xyplot-core** - Errors, unit conversion, behaviour policies
//! 2. **xyplot-designer** - SVG import and the geometry compiler
//! 3. **xyplot-communication** - Serial transport and the delivery handshake
//! 4. **xyplot-settings** - Configuration files
//! 5. **xyplot** - CLI binary that integrates all crates

use anyhow::Context;
use std::path::Path;

pub use xyplot_communication::{
    auto_detect_port, list_ports, ConnectionParams, DeliveryProgress, DeliveryReport,
    DeliverySession, HandshakeSignal, LineFramer, ProgramStreamer, RealSerialPort, SerialParity,
    SerialPortInfo, SessionPhase, SignalOutcome, StreamerConfig, StreamerHandle, Transport,
};
pub use xyplot_core::{
    ConnectionError, Error, GeometryError, PivotMode, ProtocolViolation, ReadyPolicy, Result,
    StepConverter,
};
pub use xyplot_designer::{
    CompiledProgram, GeometryCompiler, ShapeElement, ShapeKind, SvgImporter, Token,
};
pub use xyplot_settings::{Config, ConnectionSettings, MachineSettings, SessionSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - RUST_LOG environment variable support, `info` by default
/// - Pretty console output on stderr, or one JSON object per line
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    if json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .json();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .pretty();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

/// Build the compiler described by a config
pub fn compiler_for(config: &Config) -> anyhow::Result<GeometryCompiler> {
    let steps = config.step_converter()?;
    Ok(GeometryCompiler::new(steps, config.session.pivot_mode))
}

/// Import an SVG file and compile it
///
/// Numbers outside the firmware's accepted range are reported as warnings;
/// the program is still returned.
pub fn compile_svg_file(path: &Path, config: &Config) -> anyhow::Result<CompiledProgram> {
    let drawing = SvgImporter::new().import_file(path)?;
    if let Some((width, height)) = drawing.dimensions {
        tracing::debug!(width, height, "Drawing size");
    }
    let program = compiler_for(config)?
        .compile(&drawing.elements)
        .with_context(|| format!("Failed to compile {}", path.display()))?;

    for (index, value) in program.out_of_range() {
        tracing::warn!(index, value, "Token value outside the firmware's 0-99999 range");
    }
    tracing::info!(
        file = %path.display(),
        shapes = program.shape_count(),
        tokens = program.len(),
        "Compiled drawing"
    );
    Ok(program)
}

/// Resolve the serial port: explicit override, then config, then auto-detect
pub fn resolve_port(override_port: Option<&str>, config: &Config) -> anyhow::Result<String> {
    if let Some(port) = override_port.or_else(|| config.connection.explicit_port()) {
        return Ok(port.to_string());
    }
    let port = auto_detect_port()?;
    tracing::info!(port = %port, "Auto-detected serial port");
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DRAWING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
    <svg xmlns="http://www.w3.org/2000/svg" width="200" height="200">
      <circle cx="100" cy="100" r="50"/>
      <ellipse cx="100" cy="100" rx="50" ry="10" transform="rotate(45 0 0)"/>
    </svg>
    "#;

    fn write_drawing(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("drawing.svg");
        std::fs::write(&path, DRAWING).expect("Failed to write drawing");
        path
    }

    #[test]
    fn test_compile_file_with_default_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_drawing(&temp_dir);

        let program = compile_svg_file(&path, &Config::default()).unwrap();
        assert_eq!(
            program.wire_string(),
            "npC490;490;245;qpE490;490;245;49;490;490;45;qu"
        );
    }

    #[test]
    fn test_compile_file_honours_pivot_mode() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_drawing(&temp_dir);

        let mut config = Config::default();
        config.session.pivot_mode = PivotMode::Transform;
        let program = compile_svg_file(&path, &config).unwrap();
        assert!(program.wire_string().ends_with("pE490;490;245;49;0;0;45;qu"));
    }

    #[test]
    fn test_compile_missing_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = compile_svg_file(&temp_dir.path().join("none.svg"), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to read SVG file"));
    }

    #[test]
    fn test_malformed_shape_reports_element() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("bad.svg");
        std::fs::write(&path, r#"<svg><polygon points="0,0 1,1"/></svg>"#).unwrap();

        let err = compile_svg_file(&path, &Config::default()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("element 0"), "{message}");
        assert!(message.contains("at least 3 points"), "{message}");
    }

    #[test]
    fn test_explicit_port_wins() {
        let mut config = Config::default();
        config.connection.port = "/dev/ttyUSB7".to_string();
        assert_eq!(resolve_port(None, &config).unwrap(), "/dev/ttyUSB7");
        assert_eq!(resolve_port(Some("COM4"), &config).unwrap(), "COM4");
    }
}
