//! # XY-Plotter Designer
//!
//! Turns drawing geometry into the token program the plotter firmware
//! consumes.
//!
//! ## Pipeline
//!
//! ```text
//! SVG text
//!   └── SvgImporter        (ordered ShapeElements)
//!         └── Shape         (validated geometry)
//!               └── encoders (one ShapeRecord per shape or curve segment)
//!                     └── CompiledProgram  n [p K v; v; ... q]* u
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xyplot_designer::{GeometryCompiler, SvgImporter};
//!
//! let drawing = SvgImporter::new().import_file("drawing.svg")?;
//! let program = GeometryCompiler::default().compile(&drawing.elements)?;
//! println!("{}", program.wire_string());
//! ```

pub mod compiler;
pub mod encoders;
pub mod import;
pub mod path;
pub mod shapes;
pub mod token;

pub use compiler::GeometryCompiler;
pub use import::{ImportedDrawing, SvgImporter};
pub use shapes::{Point, Shape, ShapeElement, ShapeType};
pub use token::{CompiledProgram, ShapeKind, ShapeRecord, Token, NUMBER_MAX, NUMBER_MIN};
