//! Conversion options and resolver seams.

use ecow::EcoString;

use crate::ir;
use crate::Result;

/// Where footnote content ends up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FootnoteMode {
    /// References are dropped entirely.
    Disabled,
    /// Native footnote machinery of the target format.
    #[default]
    Inline,
    /// Endnote list appended after the last block.
    EndOfDocument,
    /// Endnote list spliced where the bibliography marks the hole.
    BeforeBibliography,
}

/// What a horizontal rule and a title do to pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageBreakMode {
    /// Horizontal rules break pages; titles render inline.
    #[default]
    AtRules,
    /// Titles after the first break pages; rules render as thematic
    /// break paragraphs.
    AtHeadings,
}

/// A physical length on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub value: f32,
    pub unit: Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Inch,
    Cm,
    Mm,
    Pt,
}

impl Margin {
    pub const fn new(value: f32, unit: Unit) -> Self {
        Margin { value, unit }
    }

    /// Twentieths of a point.
    pub fn to_twips(self) -> i32 {
        let per_unit = match self.unit {
            Unit::Inch => 1440.0,
            Unit::Cm => 567.0,
            Unit::Mm => 56.7,
            Unit::Pt => 20.0,
        };
        (self.value * per_unit).round() as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageMarginOptions {
    pub top: Option<Margin>,
    pub right: Option<Margin>,
    pub bottom: Option<Margin>,
    pub left: Option<Margin>,
}

/// Running header or footer content. Alignment defaults to left.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderFooterOptions {
    pub text: EcoString,
    /// Image source passed through the image resolver.
    pub image: Option<EcoString>,
    /// Rendered image height in pixels; width keeps aspect.
    pub image_height: Option<u32>,
    pub align: ir::Align,
}

impl HeaderFooterOptions {
    pub fn text(text: impl Into<EcoString>) -> Self {
        HeaderFooterOptions {
            text: text.into(),
            image: None,
            image_height: None,
            align: ir::Align::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageOptions {
    pub margins: PageMarginOptions,
    pub header: Option<HeaderFooterOptions>,
    pub footer: Option<HeaderFooterOptions>,
    pub footnote_mode: FootnoteMode,
    pub page_break_mode: PageBreakMode,
}

/// Numbering style override. String-valued so callers can pass styles
/// straight from document attributes; unrecognized values fall back to
/// the defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumberingOverride {
    /// Number format name for ordered lists, e.g. `upperRoman`.
    pub format: Option<EcoString>,
    /// Marker glyph for unordered lists.
    pub glyph: Option<EcoString>,
    /// Marker color, hex without `#`.
    pub color: Option<EcoString>,
}

/// Per-family numbering overrides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumberingOptions {
    pub ordered: Option<NumberingOverride>,
    pub bullet: Option<NumberingOverride>,
}

/// Resolved image bytes with pixel dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Turns an image source string into bytes the packaging layer embeds.
/// Must be synchronous and side-effect-free.
pub trait ImageResolver {
    fn resolve(&self, src: &str) -> Result<ImageBuffer>;
}

/// Looks up citation and bibliography text by reference id. `format`
/// names the output flavor, currently always `"text"`.
pub trait CitationResolver {
    fn citation(&self, id: &str, format: &str) -> Result<EcoString>;
    /// `(key, rendered entry)` pairs in bibliography order.
    fn bibliography(&self, format: &str) -> Result<Vec<(EcoString, EcoString)>>;
}

/// Parses embedded raw markup into a source subtree. Used for citation
/// display content; a `None` means the markup was not convertible and
/// the caller falls back to the node's own children.
pub trait MarkupTransformer {
    fn transform(&self, markup: &str) -> Option<ir::Node>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_conversion() {
        assert_eq!(Margin::new(1.0, Unit::Inch).to_twips(), 1440);
        assert_eq!(Margin::new(2.54, Unit::Cm).to_twips(), 1440);
        assert_eq!(Margin::new(72.0, Unit::Pt).to_twips(), 1440);
        assert_eq!(Margin::new(10.0, Unit::Mm).to_twips(), 567);
    }
}
