//! Core dispatch and block assembly of the serializer.

use std::mem;

use chrono::{DateTime, Utc};
use ecow::{eco_format, EcoString};
use log::warn;

use crate::error::Error;
use crate::ir;
use crate::model::{
    Block, Comment, ListNumbering, NumberingRef, Paragraph, ParagraphChild, ParagraphOptions, Run,
    RunChild, RunFormat,
};
use crate::options::{FootnoteMode, PageBreakMode};
use crate::DocxSerializer;
use crate::Result;

/// Page content width budget for images, pixels.
pub(crate) const MAX_IMAGE_WIDTH: f32 = 600.0;

/// Open hyperlink frame. Holds the siblings accumulated before the link
/// opened; the buffer collects link content until the link closes.
pub(crate) struct LinkFrame {
    pub href: EcoString,
    pub held: Vec<ParagraphChild>,
}

/// Mutable accumulator for one conversion. One instance per document;
/// every context it tracks is a field, never process state.
pub struct SerializerState<'a> {
    pub(crate) cfg: &'a DocxSerializer,
    /// Finished blocks in document order.
    pub(crate) blocks: Vec<Block>,
    /// Open run buffer of the paragraph under construction.
    pub(crate) current: Vec<ParagraphChild>,
    /// One-shot format consumed by the next emitted run.
    pub(crate) next_run_format: Option<RunFormat>,
    /// Options consumed by the next block close.
    pub(crate) next_para_opts: Option<ParagraphOptions>,
    pub(crate) open_link: Option<LinkFrame>,
    pub(crate) current_numbering: Option<NumberingRef>,
    pub(crate) numbering: Vec<ListNumbering>,
    pub(crate) numbering_seq: usize,
    pub(crate) comments: Vec<Comment>,
    pub(crate) comment_seq: usize,
    pub(crate) bookmark_seq: usize,
    /// Visible footnote index, 1-based, strictly increasing.
    pub(crate) footnote_idx: usize,
    /// Source ids in first-reference order, parallel to the indices.
    pub(crate) footnote_ids: Vec<EcoString>,
    /// Current image width budget, narrowed inside cells and columns.
    pub(crate) max_image_width: f32,
}

impl<'a> SerializerState<'a> {
    pub fn new(cfg: &'a DocxSerializer) -> Self {
        SerializerState {
            cfg,
            blocks: Vec::new(),
            current: Vec::new(),
            next_run_format: None,
            next_para_opts: None,
            open_link: None,
            current_numbering: None,
            numbering: Vec::new(),
            numbering_seq: 0,
            comments: Vec::new(),
            comment_seq: 0,
            bookmark_seq: 0,
            footnote_idx: 0,
            footnote_ids: Vec::new(),
            max_image_width: MAX_IMAGE_WIDTH,
        }
    }

    /// Dispatches one node. Exhaustive over the schema; the only fatal
    /// paths are opaque custom nodes and list items outside a list.
    pub fn render_node(&mut self, node: &ir::Node) -> Result<()> {
        match node {
            ir::Node::Text { text, marks } => {
                let format = marks
                    .iter()
                    .map(super::mark_format)
                    .fold(RunFormat::default(), RunFormat::merge);
                self.text(text, format);
                Ok(())
            }
            ir::Node::Paragraph {
                footnotes_hole: true,
                ..
            } => {
                self.blocks.push(Block::NotePlaceholder);
                Ok(())
            }
            ir::Node::Paragraph { children, .. } => {
                self.render_inline(children)?;
                self.close_block(None);
                Ok(())
            }
            ir::Node::Heading { level, children } => {
                self.render_inline(children)?;
                self.close_block(Some(ParagraphOptions {
                    style: Some(heading_style(*level)),
                    ..Default::default()
                }));
                Ok(())
            }
            ir::Node::Title { level, children } => self.title(*level, children),
            ir::Node::Blockquote { children } => {
                let opts = ParagraphOptions {
                    style: Some("IntenseQuote".into()),
                    ..Default::default()
                };
                self.render_block_children_with(children, Some(&opts))
            }
            ir::Node::CodeBlock { text } => {
                self.code_block(text);
                Ok(())
            }
            ir::Node::HorizontalRule => {
                self.horizontal_rule();
                Ok(())
            }
            ir::Node::HardBreak => {
                self.add_run_format(RunFormat {
                    break_before: true,
                    ..Default::default()
                });
                Ok(())
            }
            ir::Node::OrderedList { children } => {
                self.render_list(children, crate::numbering::ListStyle::Ordered)
            }
            ir::Node::BulletList { children } => {
                self.render_list(children, crate::numbering::ListStyle::Bullet)
            }
            ir::Node::ListItem { children } => self.render_list_item(children),
            ir::Node::Table { rows } => self.table(rows),
            ir::Node::Columns { columns } => self.columns(columns),
            ir::Node::Image {
                src,
                title,
                layout,
                width_percent,
            } => {
                self.image(src, *layout, *width_percent);
                self.close_block(None);
                if !title.is_empty() {
                    self.aside(title.clone());
                }
                Ok(())
            }
            ir::Node::ImageInline { src, max_height } => {
                self.image_inline(src, *max_height);
                Ok(())
            }
            ir::Node::Caption { id, kind, children } => self.caption(id.as_ref(), kind, children),
            ir::Node::Math {
                tex,
                display,
                numbered,
                id,
            } => self.math(tex, *display, *numbered, id.as_ref()),
            ir::Node::Link { href, children } => {
                self.open_link(href.clone());
                self.render_inline(children)?;
                self.close_link();
                Ok(())
            }
            ir::Node::FootnoteRef { id } => {
                self.footnote_ref(id);
                Ok(())
            }
            ir::Node::Comment {
                text,
                create_date,
                children,
            } => self.wrap_comment(text, create_date.as_deref(), children),
            ir::Node::Citation {
                cite_id,
                full,
                children,
            } => self.citation(cite_id, *full, children),
            ir::Node::CitationRef { id } => {
                self.citation_ref(id);
                Ok(())
            }
            ir::Node::GroupCitation { text } => {
                self.text(text, RunFormat::default());
                Ok(())
            }
            ir::Node::CitationDisplay { markup, children } => {
                self.citation_display(markup, children)
            }
            ir::Node::Bibliography { children } => self.bibliography(children),
            ir::Node::Custom {
                type_name,
                kind,
                children,
            } => match kind {
                ir::CustomKind::Atomic => Ok(()),
                ir::CustomKind::Inline => self.render_inline(children),
                ir::CustomKind::Block => self.render_block_children(children),
                ir::CustomKind::Opaque => Err(Error::schema_mismatch(type_name.clone())),
            },
        }
    }

    /// Renders a block-level child sequence.
    pub fn render_block_children(&mut self, children: &[ir::Node]) -> Result<()> {
        self.render_block_children_with(children, None)
    }

    /// Same, re-applying `opts` as pending options before each child so
    /// every closed block inside inherits them.
    pub(crate) fn render_block_children_with(
        &mut self,
        children: &[ir::Node],
        opts: Option<&ParagraphOptions>,
    ) -> Result<()> {
        for child in children {
            if let Some(opts) = opts {
                self.add_paragraph_options(opts.clone());
            }
            self.render_node(child)?;
        }
        Ok(())
    }

    /// Accumulates options for the next block close, later additions
    /// winning per field.
    pub fn add_paragraph_options(&mut self, opts: ParagraphOptions) {
        let pending = self.next_para_opts.take().unwrap_or_default();
        self.next_para_opts = Some(pending.merge(opts));
    }

    /// Accumulates a one-shot format for the next emitted run.
    pub fn add_run_format(&mut self, format: RunFormat) {
        let pending = self.next_run_format.take().unwrap_or_default();
        self.next_run_format = Some(pending.merge(format));
    }

    /// Emits one text run into the open buffer. Empty input emits
    /// nothing and leaves the pending format untouched.
    pub fn text(&mut self, text: &str, format: RunFormat) {
        if text.is_empty() {
            return;
        }
        let mut base = RunFormat::default();
        if self.open_link.is_some() {
            base.style = Some("Hyperlink".into());
        }
        if let Some(pending) = self.next_run_format.take() {
            base = base.merge(pending);
        }
        let format = base.merge(format);
        self.current.push(ParagraphChild::Run(Run {
            format,
            children: vec![RunChild::Text(normalize_text(text))],
        }));
    }

    /// Closes the open buffer into a paragraph. Option precedence:
    /// base style, then pending options, then the caller override.
    pub fn close_block(&mut self, over: Option<ParagraphOptions>) {
        let base = ParagraphOptions {
            style: Some("NormalPara".into()),
            ..Default::default()
        };
        let mut options = base.merge(self.next_para_opts.take().unwrap_or_default());
        if let Some(over) = over {
            options = options.merge(over);
        }
        self.blocks.push(Block::Paragraph(Paragraph {
            options,
            children: mem::take(&mut self.current),
        }));
    }

    fn title(&mut self, level: u8, children: &[ir::Node]) -> Result<()> {
        if self.cfg.page_options.page_break_mode == PageBreakMode::AtHeadings
            && !self.blocks.is_empty()
        {
            self.add_paragraph_options(ParagraphOptions {
                page_break_before: true,
                ..Default::default()
            });
        }
        if children.is_empty() {
            return Ok(());
        }
        self.render_inline(children)?;
        self.close_block(Some(ParagraphOptions {
            style: Some(heading_style(level)),
            ..Default::default()
        }));
        Ok(())
    }

    fn horizontal_rule(&mut self) {
        if self.cfg.page_options.page_break_mode == PageBreakMode::AtRules {
            self.add_paragraph_options(ParagraphOptions {
                page_break_before: true,
                ..Default::default()
            });
        } else {
            self.close_block(Some(ParagraphOptions {
                thematic_break: true,
                ..Default::default()
            }));
            self.close_block(None);
        }
    }

    /// Registers a comment and brackets its inline rendering with range
    /// markers. Ids count from zero in encounter order.
    pub(crate) fn wrap_comment(
        &mut self,
        text: &EcoString,
        create_date: Option<&str>,
        children: &[ir::Node],
    ) -> Result<()> {
        let date = parse_comment_date(create_date);
        let id = self.comment_seq;
        self.comment_seq += 1;
        self.comments.push(Comment {
            id,
            date,
            body: Paragraph {
                options: ParagraphOptions::default(),
                children: vec![ParagraphChild::Run(Run::text(text.clone()))],
            },
        });
        self.current.push(ParagraphChild::CommentRangeStart(id));
        self.render_inline(children)?;
        self.current.push(ParagraphChild::CommentRangeEnd(id));
        self.current.push(ParagraphChild::CommentReference(id));
        Ok(())
    }

    /// Emits a reference marker for a footnote by source id. Visible
    /// indices are handed out in first-reference order and never reused,
    /// so re-referencing a source id mints a fresh index.
    pub fn footnote_ref(&mut self, id: &EcoString) {
        match self.cfg.page_options.footnote_mode {
            FootnoteMode::Disabled => {}
            FootnoteMode::Inline => {
                self.footnote_ids.push(id.clone());
                self.footnote_idx += 1;
                self.current
                    .push(ParagraphChild::FootnoteReference(self.footnote_idx));
            }
            FootnoteMode::EndOfDocument | FootnoteMode::BeforeBibliography => {
                self.footnote_ids.push(id.clone());
                self.footnote_idx += 1;
                self.current.push(ParagraphChild::Run(Run {
                    format: RunFormat {
                        style: Some("FootnoteReference".into()),
                        ..Default::default()
                    },
                    children: vec![RunChild::Text(eco_format!("{}", self.footnote_idx))],
                }));
            }
        }
    }

    /// Renders the bibliography: the open buffer drains first, then a
    /// title paragraph and one paragraph per entry. A failed lookup
    /// degrades to no entries.
    fn bibliography(&mut self, children: &[ir::Node]) -> Result<()> {
        self.close_block(None);
        if self.cfg.page_options.footnote_mode == FootnoteMode::BeforeBibliography {
            self.blocks.push(Block::NotePlaceholder);
        }
        let title = self.cfg.bibliography_title.clone();
        self.text(&title, RunFormat::default());
        self.close_block(Some(ParagraphOptions {
            style: Some("BibliographyTitle".into()),
            ..Default::default()
        }));
        if let Some(resolver) = &self.cfg.citation_resolver {
            match resolver.bibliography("text") {
                Ok(entries) => {
                    for (_, entry) in entries {
                        self.text(&entry, RunFormat::default());
                        self.close_block(Some(ParagraphOptions {
                            style: Some("Bibliography".into()),
                            ..Default::default()
                        }));
                    }
                }
                Err(err) => warn!("bibliography lookup failed: {err}"),
            }
        } else {
            for child in children {
                let entry = child.text_content();
                self.text(&entry, RunFormat::default());
                self.close_block(Some(ParagraphOptions {
                    style: Some("Bibliography".into()),
                    ..Default::default()
                }));
            }
        }
        Ok(())
    }

    /// Renders an embedded markup fragment into an isolated run list,
    /// leaving the open buffer untouched.
    pub(crate) fn render_markup_fragment(
        &mut self,
        markup: &str,
    ) -> Result<Vec<ParagraphChild>> {
        let markup = normalize_text(markup);
        let node = self
            .cfg
            .markup_transformer
            .as_ref()
            .and_then(|t| t.transform(&markup));
        let Some(node) = node else {
            return Ok(vec![ParagraphChild::Run(Run::text(markup))]);
        };
        let held = mem::take(&mut self.current);
        let res = self.render_inline(node.children());
        let rendered = mem::replace(&mut self.current, held);
        res?;
        Ok(rendered)
    }

    /// Flushes a dangling link frame and a dangling run buffer so no
    /// inline content is lost at the end of the document.
    pub(crate) fn flush(&mut self) {
        self.close_link();
        if !self.current.is_empty() {
            self.close_block(None);
        }
    }

    /// Consumes the state into its accumulated parts: blocks, numbering
    /// definitions, comments, footnote source ids.
    pub(crate) fn finish(
        mut self,
    ) -> (Vec<Block>, Vec<ListNumbering>, Vec<Comment>, Vec<EcoString>) {
        self.flush();
        (self.blocks, self.numbering, self.comments, self.footnote_ids)
    }
}

fn heading_style(level: u8) -> EcoString {
    eco_format!("Heading{}", level.clamp(1, 6))
}

fn parse_comment_date(raw: Option<&str>) -> DateTime<Utc> {
    let parsed = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis);
    match parsed {
        Some(date) => date,
        None => {
            if let Some(raw) = raw {
                warn!("unparsable comment timestamp `{raw}`, using current time");
            }
            Utc::now()
        }
    }
}

/// Strips zero-width and control characters, maps no-break spaces to
/// plain spaces.
pub(crate) fn normalize_text(text: &str) -> EcoString {
    text.chars()
        .filter_map(|c| match c {
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => None,
            '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000C}' | '\u{000E}'..='\u{001F}' => None,
            '\u{00A0}' => Some(' '),
            c => Some(c),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_zero_width_and_controls() {
        assert_eq!(normalize_text("a\u{200B}b\u{0007}c"), "abc");
        assert_eq!(normalize_text("a\u{00A0}b"), "a b");
        assert_eq!(normalize_text("line\nkept\ttabs"), "line\nkept\ttabs");
    }

    #[test]
    fn comment_date_parses_epoch_millis() {
        let date = parse_comment_date(Some("1700000000000"));
        assert_eq!(date.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn comment_date_falls_back_on_garbage() {
        let before = Utc::now();
        let date = parse_comment_date(Some("not-a-time"));
        assert!(date >= before);
    }
}
