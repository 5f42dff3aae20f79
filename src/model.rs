//! Target document model.
//!
//! The serializer produces these entities instead of file bytes; the
//! packaging layer (see [`crate::writer`]) or an external document-object
//! library turns a finished [`DocumentModel`] into a word-processor file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ecow::EcoString;

use crate::ir::Align;

/// Vertical script shift of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Superscript,
    Subscript,
}

/// Merged formatting descriptor for one run.
///
/// Merge is left-to-right: every `Some` field of the later descriptor
/// wins, `break_before` accumulates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunFormat {
    pub bold: Option<bool>,
    pub italics: Option<bool>,
    pub underline: Option<EcoString>,
    pub strike: Option<bool>,
    pub small_caps: Option<bool>,
    pub all_caps: Option<bool>,
    pub script: Option<Script>,
    pub color: Option<EcoString>,
    pub font: Option<EcoString>,
    /// Half-points.
    pub size: Option<usize>,
    pub highlight: Option<EcoString>,
    /// Character style id.
    pub style: Option<EcoString>,
    /// One-shot line break emitted before the run content.
    pub break_before: bool,
}

impl RunFormat {
    pub fn merge(self, later: RunFormat) -> RunFormat {
        RunFormat {
            bold: later.bold.or(self.bold),
            italics: later.italics.or(self.italics),
            underline: later.underline.or(self.underline),
            strike: later.strike.or(self.strike),
            small_caps: later.small_caps.or(self.small_caps),
            all_caps: later.all_caps.or(self.all_caps),
            script: later.script.or(self.script),
            color: later.color.or(self.color),
            font: later.font.or(self.font),
            size: later.size.or(self.size),
            highlight: later.highlight.or(self.highlight),
            style: later.style.or(self.style),
            break_before: self.break_before || later.break_before,
        }
    }
}

/// An embedded image, dimensions in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRun {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunChild {
    Text(EcoString),
    Break,
    Image(ImageRun),
    /// A sequence field of the named counter, e.g. `Equation`.
    Sequence(EcoString),
}

/// The minimal inline formatted unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Run {
    pub format: RunFormat,
    pub children: Vec<RunChild>,
}

impl Run {
    pub fn text(text: impl Into<EcoString>) -> Self {
        Run {
            format: RunFormat::default(),
            children: vec![RunChild::Text(text.into())],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hyperlink {
    pub href: EcoString,
    pub children: Vec<ParagraphChild>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub id: EcoString,
    pub children: Vec<ParagraphChild>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MathRun {
    pub tex: EcoString,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParagraphChild {
    Run(Run),
    Hyperlink(Hyperlink),
    Bookmark(Bookmark),
    Math(MathRun),
    CommentRangeStart(usize),
    CommentRangeEnd(usize),
    CommentReference(usize),
    /// Native footnote reference marker, 1-based visible index.
    FootnoteReference(usize),
    ColumnBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStopKind {
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabStop {
    pub kind: TabStopKind,
    /// Twips from the leading margin.
    pub position: usize,
}

/// Exact line spacing, twips. Used by the column-break spacer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphSpacing {
    pub line: u32,
    pub before: u32,
    pub after: u32,
}

/// Numbering attachment of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberingRef {
    pub reference: EcoString,
    pub level: usize,
}

/// Paragraph-level formatting. Merge precedence at block close is
/// base style < pending options < override options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphOptions {
    pub style: Option<EcoString>,
    pub alignment: Option<Align>,
    pub numbering: Option<NumberingRef>,
    pub page_break_before: bool,
    pub thematic_break: bool,
    pub tab_stops: Vec<TabStop>,
    pub spacing: Option<ParagraphSpacing>,
}

impl ParagraphOptions {
    pub fn merge(self, later: ParagraphOptions) -> ParagraphOptions {
        ParagraphOptions {
            style: later.style.or(self.style),
            alignment: later.alignment.or(self.alignment),
            numbering: later.numbering.or(self.numbering),
            page_break_before: self.page_break_before || later.page_break_before,
            thematic_break: self.thematic_break || later.thematic_break,
            tab_stops: if later.tab_stops.is_empty() {
                self.tab_stops
            } else {
                later.tab_stops
            },
            spacing: later.spacing.or(self.spacing),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub options: ParagraphOptions,
    pub children: Vec<ParagraphChild>,
}

/// A table cell holding an isolated block list.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub width_percent: f32,
    pub colspan: usize,
    pub rowspan: usize,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub header: bool,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

/// Blocks sharing one multi-column page region, with per-column width
/// bases in percent. Column breaks appear as explicit paragraph children
/// between consecutive columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSection {
    pub widths: Vec<f32>,
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Columns(ColumnSection),
    /// Splice point for end-of-document notes; never survives
    /// finalization.
    NotePlaceholder,
}

/// One depth level of a numbering definition.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberingLevel {
    pub level: usize,
    /// Word number format name, e.g. `decimal` or `bullet`.
    pub format: EcoString,
    /// Level text, e.g. `%1.` or a bullet glyph.
    pub text: EcoString,
    /// Left indent, twips.
    pub indent: i32,
    /// Hanging indent holding the marker, twips.
    pub hanging: i32,
    pub color: Option<EcoString>,
}

/// All depth-level definitions for one logical list and its nested
/// sub-lists, keyed by a per-root-list reference id.
#[derive(Debug, Clone, PartialEq)]
pub struct ListNumbering {
    pub reference: EcoString,
    pub levels: Vec<NumberingLevel>,
}

/// A document comment, parallel to the main content.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: usize,
    pub date: DateTime<Utc>,
    pub body: Paragraph,
}

/// Page margins, twips.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMargins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderFooter {
    pub paragraph: Paragraph,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub count: usize,
    /// Inter-column space, twips.
    pub space: u32,
    /// Width bases in percent.
    pub widths: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionProps {
    pub columns: Option<ColumnSpec>,
    pub margins: Option<PageMargins>,
    pub header: Option<HeaderFooter>,
    pub footer: Option<HeaderFooter>,
}

/// A page-layout grouping with its own margins, column count and
/// header/footer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    pub props: SectionProps,
    pub children: Vec<Block>,
}

/// The packaging-ready output of one conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentModel {
    pub sections: Vec<Section>,
    pub numbering: Vec<ListNumbering>,
    pub comments: Vec<Comment>,
    /// Inline footnote content keyed by 1-based visible index.
    pub footnotes: BTreeMap<usize, Vec<Paragraph>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_format_merge_later_wins() {
        let a = RunFormat {
            bold: Some(true),
            color: Some("FF0000".into()),
            ..Default::default()
        };
        let b = RunFormat {
            color: Some("00FF00".into()),
            italics: Some(true),
            break_before: true,
            ..Default::default()
        };
        let merged = a.merge(b);
        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.italics, Some(true));
        assert_eq!(merged.color.as_deref(), Some("00FF00"));
        assert!(merged.break_before);
    }

    #[test]
    fn paragraph_options_merge_precedence() {
        let base = ParagraphOptions {
            style: Some("NormalPara".into()),
            ..Default::default()
        };
        let pending = ParagraphOptions {
            style: Some("BulletList".into()),
            page_break_before: true,
            ..Default::default()
        };
        let over = ParagraphOptions {
            style: Some("Heading1".into()),
            ..Default::default()
        };
        let merged = base.merge(pending).merge(over);
        assert_eq!(merged.style.as_deref(), Some("Heading1"));
        assert!(merged.page_break_before);
    }
}
