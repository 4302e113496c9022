//! Shape record encoders.
//!
//! Every encoder returns one or more complete records of the form
//! `[ShapeStart, Kind, Number..., ShapeEnd]`. Lengths are converted to
//! motor steps; rotation angles are sent in whole degrees.

use crate::path::{split_segments, SEGMENT_LEN};
use crate::shapes::{Circle, CurvePath, Ellipse, Point, Polygon, Polyline, Rectangle};
use crate::token::{ShapeKind, ShapeRecord, Token};
use smallvec::smallvec;
use xyplot_core::{GeometryError, PivotMode, StepConverter};

/// Minimum vertex count of a polygon record
pub const MIN_POLYGON_POINTS: usize = 3;

fn record(kind: ShapeKind, numbers: impl IntoIterator<Item = i64>) -> ShapeRecord {
    let mut tokens: ShapeRecord = smallvec![Token::ShapeStart, Token::Kind(kind)];
    tokens.extend(numbers.into_iter().map(Token::Number));
    tokens.push(Token::ShapeEnd);
    tokens
}

/// `C cx cy r`
pub fn encode_circle(circle: &Circle, steps: &StepConverter) -> ShapeRecord {
    record(
        ShapeKind::Circle,
        [
            steps.to_steps(circle.center.x),
            steps.to_steps(circle.center.y),
            steps.to_steps(circle.radius),
        ],
    )
}

/// `E cx cy rx ry [pivot_x pivot_y angle]`
pub fn encode_ellipse(ellipse: &Ellipse, steps: &StepConverter, pivot_mode: PivotMode) -> ShapeRecord {
    let mut numbers: Vec<i64> = vec![
        steps.to_steps(ellipse.center.x),
        steps.to_steps(ellipse.center.y),
        steps.to_steps(ellipse.rx),
        steps.to_steps(ellipse.ry),
    ];

    if let Some(rotation) = &ellipse.rotation {
        let pivot = match (pivot_mode, rotation.pivot) {
            (PivotMode::Transform, Some(pivot)) => pivot,
            _ => ellipse.center,
        };
        numbers.push(steps.to_steps(pivot.x));
        numbers.push(steps.to_steps(pivot.y));
        numbers.push(rotation.wire_angle());
    }

    record(ShapeKind::Ellipse, numbers)
}

/// `P x0 y0 x1 y1 ...`
pub fn encode_polygon(points: &[Point], steps: &StepConverter) -> Result<ShapeRecord, GeometryError> {
    if points.len() < MIN_POLYGON_POINTS {
        return Err(GeometryError::TooFewPoints {
            count: points.len(),
        });
    }
    Ok(record(
        ShapeKind::Polygon,
        points
            .iter()
            .flat_map(|p| [steps.to_steps(p.x), steps.to_steps(p.y)]),
    ))
}

/// Polygon record for an SVG `<polygon>`, ending back on its first vertex
pub fn encode_point_list(polygon: &Polygon, steps: &StepConverter) -> Result<ShapeRecord, GeometryError> {
    if polygon.vertex_count() < MIN_POLYGON_POINTS {
        return Err(GeometryError::TooFewPoints {
            count: polygon.vertex_count(),
        });
    }
    encode_polygon(&polygon.points, steps)
}

/// Polygon record for an SVG `<polyline>`; the pen stops on the last vertex
pub fn encode_polyline(polyline: &Polyline, steps: &StepConverter) -> Result<ShapeRecord, GeometryError> {
    encode_polygon(&polyline.points, steps)
}

/// A rectangle is sent as its closed five-point outline
pub fn encode_rect(rect: &Rectangle, steps: &StepConverter) -> ShapeRecord {
    let outline = rect.outline();
    record(
        ShapeKind::Polygon,
        outline
            .iter()
            .flat_map(|p| [steps.to_steps(p.x), steps.to_steps(p.y)]),
    )
}

/// `B x0 y0 x1 y1 x2 y2 x3 y3` for one cubic segment
pub fn encode_bezier(segment: &[f64; SEGMENT_LEN], steps: &StepConverter) -> ShapeRecord {
    record(ShapeKind::Bezier, segment.iter().map(|&v| steps.to_steps(v)))
}

/// One Bezier record per segment of a curve chain
pub fn encode_path(path: &CurvePath, steps: &StepConverter) -> Result<Vec<ShapeRecord>, GeometryError> {
    let segments = split_segments(&path.coordinates)?;
    Ok(segments
        .into_iter()
        .map(|segment| encode_bezier(segment, steps))
        .collect())
}
