//! # SVG Import
//!
//! Extracts drawing elements from SVG text for the geometry compiler.
//!
//! This is a tag scanner, not a validating XML parser. It walks the
//! document once, in order, and reports every element start tag with its
//! raw attributes. Document order matters: it is the order the plotter
//! draws in.
//!
//! Skipped:
//! - comments, processing instructions and doctype declarations
//! - the `<svg>` root and `<g>` group tags themselves (their children
//!   are still reported)
//! - everything inside `<defs>`, which is never drawn directly

use crate::shapes::ShapeElement;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Elements imported from one SVG document
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDrawing {
    /// Elements in document order
    pub elements: Vec<ShapeElement>,
    /// `width`/`height` of the root element, when both are numeric
    pub dimensions: Option<(f64, f64)>,
}

/// SVG importer producing [`ShapeElement`]s
#[derive(Debug, Clone, Default)]
pub struct SvgImporter;

impl SvgImporter {
    pub fn new() -> Self {
        Self
    }

    /// Import SVG from a file on disk
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportedDrawing> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SVG file {}", path.display()))?;
        self.import_string(&content)
    }

    /// Import SVG from string content
    pub fn import_string(&self, svg_content: &str) -> Result<ImportedDrawing> {
        if !svg_content.contains("<svg") {
            anyhow::bail!("Invalid SVG: missing <svg> element");
        }

        let mut elements = Vec::new();
        let mut dimensions = None;
        let mut defs_depth = 0usize;
        let mut pos = 0;

        while let Some(offset) = svg_content[pos..].find('<') {
            let start = pos + offset;
            let rest = &svg_content[start..];

            if rest.starts_with("<!--") {
                pos = start + skip_past(rest, "-->")?;
                continue;
            }
            if rest.starts_with("<?") {
                pos = start + skip_past(rest, "?>")?;
                continue;
            }
            if rest.starts_with("<!") {
                pos = start + skip_past(rest, ">")?;
                continue;
            }

            let tag_len = tag_end(rest).ok_or_else(|| anyhow!("Unterminated tag at byte {}", start))?;
            let tag = &rest[1..tag_len - 1];
            pos = start + tag_len;

            if let Some(closing) = tag.strip_prefix('/') {
                if closing.trim() == "defs" {
                    defs_depth = defs_depth.saturating_sub(1);
                }
                continue;
            }

            let self_closing = tag.trim_end().ends_with('/');
            let body = tag.trim_end().trim_end_matches('/');
            let name_len = body
                .find(|c: char| c.is_whitespace())
                .unwrap_or(body.len());
            let name = &body[..name_len];
            let mut element = ShapeElement::new(name);
            parse_attributes(&body[name_len..], &mut element);

            match name {
                "defs" => {
                    if !self_closing {
                        defs_depth += 1;
                    }
                }
                "svg" => {
                    if dimensions.is_none() {
                        dimensions = Self::dimensions(&element);
                    }
                }
                "g" => {}
                _ if defs_depth > 0 => {}
                _ => elements.push(element),
            }
        }

        tracing::debug!(elements = elements.len(), "Imported SVG");
        Ok(ImportedDrawing {
            elements,
            dimensions,
        })
    }

    fn dimensions(svg: &ShapeElement) -> Option<(f64, f64)> {
        let parse = |name| {
            svg.attr(name)
                .map(|v| v.trim().trim_end_matches("mm").trim_end_matches("px"))
                .and_then(|v| v.parse::<f64>().ok())
        };
        Some((parse("width")?, parse("height")?))
    }
}

/// Length up to and including `terminator`
fn skip_past(rest: &str, terminator: &str) -> Result<usize> {
    rest.find(terminator)
        .map(|i| i + terminator.len())
        .ok_or_else(|| anyhow!("Unterminated markup, expected '{}'", terminator))
}

/// Length of the tag starting at `rest[0] == '<'`, honouring quoted values
fn tag_end(rest: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in rest.char_indices().skip(1) {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Parse `name="value"` pairs; attributes without a quoted value are ignored
fn parse_attributes(mut rest: &str, element: &mut ShapeElement) {
    loop {
        rest = rest.trim_start();
        let Some(eq) = rest.find('=') else {
            return;
        };
        let name = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();
        let Some(quote) = after.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            return;
        };
        let Some(close) = after[1..].find(quote) else {
            return;
        };
        // A bare attribute before this one leaves its name glued on; keep the last word
        let name = name.rsplit(char::is_whitespace).next().unwrap_or(name);
        if !name.is_empty() {
            element
                .attributes
                .insert(name.to_string(), after[1..1 + close].to_string());
        }
        rest = &after[close + 2..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_svg() {
        assert!(SvgImporter::new().import_string("<html></html>").is_err());
    }

    #[test]
    fn test_elements_in_document_order() {
        let svg = r#"<?xml version="1.0"?>
<!-- drawn by hand -->
<svg xmlns="http://www.w3.org/2000/svg" width="210" height="297">
  <g id="layer1">
    <circle cx="10" cy="20" r="5"/>
    <rect x="1" y="2" width="3" height="4" />
    <ellipse cx="5" cy="5" rx="2" ry="1" transform="rotate(30)"></ellipse>
  </g>
</svg>"#;
        let drawing = SvgImporter::new().import_string(svg).unwrap();
        let kinds: Vec<&str> = drawing.elements.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["circle", "rect", "ellipse"]);
        assert_eq!(drawing.dimensions, Some((210.0, 297.0)));
        assert_eq!(drawing.elements[0].attr("r"), Some("5"));
        assert_eq!(drawing.elements[2].attr("transform"), Some("rotate(30)"));
    }

    #[test]
    fn test_defs_are_not_drawn() {
        let svg = r#"<svg><defs><path d="M0 0"/></defs><path d="M1 1"/></svg>"#;
        let drawing = SvgImporter::new().import_string(svg).unwrap();
        assert_eq!(drawing.elements.len(), 1);
        assert_eq!(drawing.elements[0].attr("d"), Some("M1 1"));
    }

    #[test]
    fn test_quoted_angle_bracket_and_single_quotes() {
        let svg = r#"<svg><path id='a>b' d='M 1 2'/></svg>"#;
        let drawing = SvgImporter::new().import_string(svg).unwrap();
        assert_eq!(drawing.elements[0].attr("id"), Some("a>b"));
        assert_eq!(drawing.elements[0].attr("d"), Some("M 1 2"));
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        assert!(SvgImporter::new().import_string("<svg><rect x=\"1\"").is_err());
    }
}
