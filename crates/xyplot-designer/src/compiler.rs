//! Geometry compiler: shape elements in, one framed token program out.

use crate::encoders::{
    encode_circle, encode_ellipse, encode_path, encode_point_list, encode_polyline, encode_rect,
};
use crate::shapes::{Shape, ShapeElement};
use crate::token::{CompiledProgram, Token};
use xyplot_core::{GeometryError, PivotMode, StepConverter};

/// Turns an ordered list of drawing elements into a plotter program
///
/// The compiler holds only immutable configuration, so one value can be
/// shared across threads and reused for any number of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometryCompiler {
    steps: StepConverter,
    pivot_mode: PivotMode,
}

impl GeometryCompiler {
    pub fn new(steps: StepConverter, pivot_mode: PivotMode) -> Self {
        Self { steps, pivot_mode }
    }

    pub fn steps(&self) -> &StepConverter {
        &self.steps
    }

    pub fn pivot_mode(&self) -> PivotMode {
        self.pivot_mode
    }

    /// Compile elements in document order
    ///
    /// Elements whose kind the plotter cannot draw are skipped. The first
    /// malformed element fails the whole call, tagged with its index.
    pub fn compile(&self, elements: &[ShapeElement]) -> Result<CompiledProgram, GeometryError> {
        let mut shapes = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            match Shape::from_element(element).map_err(|e| e.at_element(index))? {
                Some(shape) => shapes.push((index, shape)),
                None => tracing::debug!(index, kind = %element.kind, "Skipping unsupported element"),
            }
        }

        let mut tokens = vec![Token::SessionStart];
        for (index, shape) in &shapes {
            self.encode_into(shape, &mut tokens)
                .map_err(|e| e.at_element(*index))?;
        }
        tokens.push(Token::SessionEnd);

        let program = CompiledProgram::from_tokens(tokens);
        tracing::debug!(
            elements = elements.len(),
            shapes = program.shape_count(),
            tokens = program.len(),
            "Compiled drawing"
        );
        Ok(program)
    }

    fn encode_into(&self, shape: &Shape, tokens: &mut Vec<Token>) -> Result<(), GeometryError> {
        match shape {
            Shape::Circle(circle) => tokens.extend(encode_circle(circle, &self.steps)),
            Shape::Ellipse(ellipse) => {
                tokens.extend(encode_ellipse(ellipse, &self.steps, self.pivot_mode))
            }
            Shape::Rectangle(rect) => tokens.extend(encode_rect(rect, &self.steps)),
            Shape::Polygon(polygon) => tokens.extend(encode_point_list(polygon, &self.steps)?),
            Shape::Polyline(polyline) => tokens.extend(encode_polyline(polyline, &self.steps)?),
            Shape::Path(path) => {
                for record in encode_path(path, &self.steps)? {
                    tokens.extend(record);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::ShapeKind;

    fn circle(cx: &str, cy: &str, r: &str) -> ShapeElement {
        ShapeElement::new("circle")
            .with_attr("cx", cx)
            .with_attr("cy", cy)
            .with_attr("r", r)
    }

    #[test]
    fn test_empty_document_is_framed() {
        let program = GeometryCompiler::default().compile(&[]).unwrap();
        assert_eq!(program.tokens(), &[Token::SessionStart, Token::SessionEnd]);
    }

    #[test]
    fn test_single_circle() {
        let program = GeometryCompiler::default()
            .compile(&[circle("100", "100", "50")])
            .unwrap();
        assert_eq!(
            program.tokens(),
            &[
                Token::SessionStart,
                Token::ShapeStart,
                Token::Kind(ShapeKind::Circle),
                Token::Number(490),
                Token::Number(490),
                Token::Number(245),
                Token::ShapeEnd,
                Token::SessionEnd,
            ]
        );
        assert_eq!(program.wire_string(), "npC490;490;245;qu");
    }

    #[test]
    fn test_unknown_elements_skipped() {
        let elements = vec![
            ShapeElement::new("text").with_attr("x", "1"),
            circle("1", "1", "1"),
            ShapeElement::new("line"),
        ];
        let program = GeometryCompiler::default().compile(&elements).unwrap();
        assert_eq!(program.shape_count(), 1);
    }

    #[test]
    fn test_error_names_element_index() {
        let elements = vec![circle("1", "1", "1"), circle("1", "1", "oops")];
        let err = GeometryCompiler::default().compile(&elements).unwrap_err();
        assert!(matches!(err, GeometryError::AtElement { index: 1, .. }));
    }

    #[test]
    fn test_document_order_preserved() {
        let elements = vec![
            ShapeElement::new("rect")
                .with_attr("width", "1")
                .with_attr("height", "1"),
            circle("0", "0", "1"),
        ];
        let program = GeometryCompiler::default().compile(&elements).unwrap();
        assert_eq!(program.get(2), Some(&Token::Kind(ShapeKind::Polygon)));
        assert_eq!(program.get(15), Some(&Token::Kind(ShapeKind::Circle)));
    }
}
