//! Shape elements handed over by the importer, and the validated shapes
//! the compiler encodes.

use crate::path::extract_coordinates;
use std::collections::BTreeMap;
use xyplot_core::GeometryError;

/// A drawing element as produced by a markup importer
///
/// The kind is the element's tag name; attributes are kept as the raw
/// strings found in the document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeElement {
    pub kind: String,
    pub attributes: BTreeMap<String, String>,
}

impl ShapeElement {
    /// Creates an element with no attributes
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Required numeric attribute
    fn number(&self, name: &str) -> Result<f64, GeometryError> {
        match self.attr(name) {
            Some(raw) => parse_length(raw).ok_or_else(|| GeometryError::InvalidAttribute {
                kind: self.kind.clone(),
                attribute: name.to_string(),
                value: raw.to_string(),
            }),
            None => Err(GeometryError::MissingAttribute {
                kind: self.kind.clone(),
                attribute: name.to_string(),
            }),
        }
    }

    /// Required `points` list
    fn points(&self) -> Result<Vec<Point>, GeometryError> {
        let raw = self.attr("points").ok_or_else(|| GeometryError::MissingAttribute {
            kind: self.kind.clone(),
            attribute: "points".to_string(),
        })?;
        parse_points(raw)
    }

    /// Numeric attribute that defaults to zero when absent, as SVG
    /// positions do
    fn number_or_zero(&self, name: &str) -> Result<f64, GeometryError> {
        if self.attr(name).is_some() {
            self.number(name)
        } else {
            Ok(0.0)
        }
    }
}

/// Parse an SVG length in user units
///
/// A `px` or `mm` suffix is accepted; drawings are authored at one user
/// unit per millimetre, so both read as the bare number.
fn parse_length(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed
        .strip_suffix("px")
        .or_else(|| trimmed.strip_suffix("mm"))
        .unwrap_or(trimmed)
        .trim_end();
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Represents a 2D point with X and Y coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A `rotate(angle[, ox, oy])` transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    /// Angle in degrees, as written
    pub angle_deg: f64,
    /// Explicit pivot, when the transform supplies one
    pub pivot: Option<Point>,
}

impl Rotation {
    /// Parse a transform attribute
    ///
    /// The attribute is a list of `name(args)` entries. The first `rotate`
    /// entry is used; the other entries have no record field on the plotter
    /// and are skipped. `Ok(None)` when there is no `rotate` entry.
    pub fn parse(transform: &str) -> Result<Option<Self>, GeometryError> {
        let invalid = || GeometryError::InvalidTransform {
            transform: transform.to_string(),
        };

        let mut rest = transform.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        while !rest.is_empty() {
            let name_end = rest
                .find(|c: char| c == '(' || c == ',' || c.is_whitespace())
                .unwrap_or(rest.len());
            let name = &rest[..name_end];
            let after_name = rest[name_end..].trim_start();

            let Some(open) = after_name.strip_prefix('(') else {
                if name == "rotate" {
                    return Err(invalid());
                }
                rest = after_name;
                continue;
            };
            let Some(close) = open.find(')') else {
                return if name == "rotate" { Err(invalid()) } else { Ok(None) };
            };

            if name == "rotate" {
                return Self::from_args(&open[..close]).map(Some).ok_or_else(invalid);
            }
            rest = open[close + 1..]
                .trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        }
        Ok(None)
    }

    /// `angle` or `angle ox oy`, comma or space separated
    fn from_args(args: &str) -> Option<Self> {
        let values = args
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()?;

        match values.as_slice() {
            [angle] => Some(Self {
                angle_deg: *angle,
                pivot: None,
            }),
            [angle, ox, oy] => Some(Self {
                angle_deg: *angle,
                pivot: Some(Point::new(*ox, *oy)),
            }),
            _ => None,
        }
    }

    /// Angle as the firmware expects it: whole degrees in `0..360`
    pub fn wire_angle(&self) -> i64 {
        let degrees = self.angle_deg.rem_euclid(360.0).round() as i64;
        degrees % 360
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    pub center: Point,
    pub rx: f64,
    pub ry: f64,
    pub rotation: Option<Rotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    /// Corner points walked clockwise from the origin corner, closing back
    /// on the first one
    pub fn outline(&self) -> [Point; 5] {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.width, self.y + self.height);
        [
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
            Point::new(x0, y0),
        ]
    }
}

/// A closed outline; the last vertex always equals the first
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    /// Build from SVG vertices, appending the first vertex when the list
    /// does not already end on it
    pub fn closed(mut points: Vec<Point>) -> Self {
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            if first != last {
                points.push(first);
            }
        }
        Self { points }
    }

    /// Distinct vertices, not counting the closing repeat
    pub fn vertex_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }
}

/// An open chain of line segments, drawn exactly as listed
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
}

/// A chain of cubic curves, stored as the raw coordinate list
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePath {
    pub coordinates: Vec<f64>,
}

/// Element kinds the compiler knows how to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Rectangle,
    Circle,
    Ellipse,
    Polygon,
    Polyline,
    Path,
}

impl ShapeType {
    /// Map an element tag to a shape type; `None` for unsupported tags
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "rect" => Some(ShapeType::Rectangle),
            "circle" => Some(ShapeType::Circle),
            "ellipse" => Some(ShapeType::Ellipse),
            "polygon" => Some(ShapeType::Polygon),
            "polyline" => Some(ShapeType::Polyline),
            "path" => Some(ShapeType::Path),
            _ => None,
        }
    }
}

/// A validated drawing primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rectangle(Rectangle),
    Circle(Circle),
    Ellipse(Ellipse),
    Polygon(Polygon),
    Polyline(Polyline),
    Path(CurvePath),
}

impl Shape {
    /// Validate an element into a shape
    ///
    /// Returns `Ok(None)` for element kinds the plotter cannot draw.
    pub fn from_element(element: &ShapeElement) -> Result<Option<Self>, GeometryError> {
        let Some(shape_type) = ShapeType::from_tag(&element.kind) else {
            return Ok(None);
        };

        let shape = match shape_type {
            ShapeType::Rectangle => Shape::Rectangle(Rectangle {
                x: element.number_or_zero("x")?,
                y: element.number_or_zero("y")?,
                width: element.number("width")?,
                height: element.number("height")?,
            }),
            ShapeType::Circle => Shape::Circle(Circle {
                center: Point::new(element.number_or_zero("cx")?, element.number_or_zero("cy")?),
                radius: element.number("r")?,
            }),
            ShapeType::Ellipse => {
                let rotation = match element.attr("transform") {
                    Some(transform) => Rotation::parse(transform)?,
                    None => None,
                };
                Shape::Ellipse(Ellipse {
                    center: Point::new(
                        element.number_or_zero("cx")?,
                        element.number_or_zero("cy")?,
                    ),
                    rx: element.number("rx")?,
                    ry: element.number("ry")?,
                    rotation,
                })
            }
            ShapeType::Polygon => Shape::Polygon(Polygon::closed(element.points()?)),
            ShapeType::Polyline => Shape::Polyline(Polyline {
                points: element.points()?,
            }),
            ShapeType::Path => {
                let raw = element.attr("d").ok_or_else(|| GeometryError::MissingAttribute {
                    kind: element.kind.clone(),
                    attribute: "d".to_string(),
                })?;
                Shape::Path(CurvePath {
                    coordinates: extract_coordinates(raw),
                })
            }
        };

        Ok(Some(shape))
    }
}

/// Parse an SVG `points` list into point pairs
fn parse_points(raw: &str) -> Result<Vec<Point>, GeometryError> {
    let values = extract_coordinates(raw);
    if values.len() % 2 != 0 {
        return Err(GeometryError::UnpairedCoordinate {
            count: values.len(),
        });
    }
    Ok(values
        .chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect())
}
