//! Section assembly and end-of-document note finalization.

use ecow::{eco_format, EcoString};
use log::warn;

use crate::model::{
    Block, ColumnSpec, HeaderFooter, ImageRun, PageMargins, Paragraph, ParagraphChild,
    ParagraphOptions, Run, RunChild, Section, SectionProps,
};
use crate::options::{FootnoteMode, HeaderFooterOptions, ImageResolver, PageOptions};

/// Space between page columns, twips.
const COLUMN_SPACE: u32 = 708;

/// Default page margin when only some sides are configured, twips.
const DEFAULT_MARGIN: i32 = 1440;

/// Splices endnote content into the block list and removes every note
/// placeholder.
///
/// In an endnote mode with notes present, the note list (a spacer, a
/// title paragraph, one numbered paragraph per note) replaces the first
/// placeholder when the mode targets the bibliography and a placeholder
/// exists, otherwise it lands after the last block. Placeholders never
/// survive.
pub fn finalize_notes(
    blocks: &mut Vec<Block>,
    notes: &[Vec<ParagraphChild>],
    mode: FootnoteMode,
    title: &EcoString,
) {
    let endnotes = matches!(
        mode,
        FootnoteMode::EndOfDocument | FootnoteMode::BeforeBibliography
    );
    if endnotes && !notes.is_empty() {
        let mut tail = Vec::with_capacity(notes.len() + 2);
        tail.push(Block::Paragraph(Paragraph::default()));
        tail.push(Block::Paragraph(Paragraph {
            options: ParagraphOptions {
                style: Some("BibliographyTitle".into()),
                ..Default::default()
            },
            children: vec![ParagraphChild::Run(Run::text(title.clone()))],
        }));
        for (idx, note) in notes.iter().enumerate() {
            let mut children = vec![ParagraphChild::Run(Run::text(eco_format!("{}. ", idx + 1)))];
            children.extend(note.iter().cloned());
            tail.push(Block::Paragraph(Paragraph {
                options: ParagraphOptions {
                    style: Some("Bibliography".into()),
                    ..Default::default()
                },
                children,
            }));
        }

        let hole = blocks.iter().position(|b| matches!(b, Block::NotePlaceholder));
        match hole {
            Some(idx) if mode == FootnoteMode::BeforeBibliography => {
                blocks.splice(idx..=idx, tail);
            }
            _ => blocks.extend(tail),
        }
    }
    blocks.retain(|b| !matches!(b, Block::NotePlaceholder));
}

/// Groups blocks into page sections. Consecutive non-column blocks share
/// one continuous section; every multi-column region is its own
/// standalone section and is never merged with neighbors. Page margins
/// and header/footer attach to the leading section only.
pub fn assemble(
    blocks: Vec<Block>,
    page: &PageOptions,
    images: &dyn ImageResolver,
) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut pending: Vec<Block> = Vec::new();

    for block in blocks {
        match block {
            Block::Columns(cols) => {
                if !pending.is_empty() {
                    sections.push(Section {
                        props: SectionProps::default(),
                        children: std::mem::take(&mut pending),
                    });
                }
                sections.push(Section {
                    props: SectionProps {
                        columns: Some(ColumnSpec {
                            count: cols.widths.len(),
                            space: COLUMN_SPACE,
                            widths: cols.widths,
                        }),
                        ..Default::default()
                    },
                    children: cols.children,
                });
            }
            other => pending.push(other),
        }
    }
    if !pending.is_empty() || sections.is_empty() {
        sections.push(Section {
            props: SectionProps::default(),
            children: pending,
        });
    }

    let leading = &mut sections[0].props;
    leading.margins = margins(page);
    leading.header = page
        .header
        .as_ref()
        .map(|opts| header_footer(opts, images));
    leading.footer = page
        .footer
        .as_ref()
        .map(|opts| header_footer(opts, images));
    sections
}

fn margins(page: &PageOptions) -> Option<PageMargins> {
    let m = &page.margins;
    if m.top.is_none() && m.right.is_none() && m.bottom.is_none() && m.left.is_none() {
        return None;
    }
    let side = |v: Option<crate::options::Margin>| v.map_or(DEFAULT_MARGIN, |m| m.to_twips());
    Some(PageMargins {
        top: side(m.top),
        right: side(m.right),
        bottom: side(m.bottom),
        left: side(m.left),
    })
}

fn header_footer(opts: &HeaderFooterOptions, images: &dyn ImageResolver) -> HeaderFooter {
    let mut children = Vec::new();
    if let Some(src) = &opts.image {
        match images.resolve(src) {
            Ok(buf) => {
                let height = opts.image_height.unwrap_or(buf.height).max(1);
                let width = if buf.height > 0 {
                    (buf.width as f32 * height as f32 / buf.height as f32).round() as u32
                } else {
                    buf.width
                };
                children.push(ParagraphChild::Run(Run {
                    format: Default::default(),
                    children: vec![RunChild::Image(ImageRun {
                        data: buf.data,
                        width,
                        height,
                    })],
                }));
            }
            Err(err) => warn!("header image `{src}` could not be resolved: {err}"),
        }
    }
    if !opts.text.is_empty() {
        children.push(ParagraphChild::Run(Run::text(opts.text.clone())));
    }
    HeaderFooter {
        paragraph: Paragraph {
            options: ParagraphOptions {
                alignment: Some(opts.align),
                ..Default::default()
            },
            children,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnSection;
    use crate::options::{ImageBuffer, Margin, Unit};
    use crate::Result;

    struct NoImages;
    impl ImageResolver for NoImages {
        fn resolve(&self, _src: &str) -> Result<ImageBuffer> {
            Err("no images".into())
        }
    }

    fn para() -> Block {
        Block::Paragraph(Paragraph::default())
    }

    #[test]
    fn columns_split_into_standalone_sections() {
        let blocks = vec![
            para(),
            Block::Columns(ColumnSection {
                widths: vec![50.0, 50.0],
                children: vec![para()],
            }),
            para(),
        ];
        let sections = assemble(blocks, &PageOptions::default(), &NoImages);
        assert_eq!(sections.len(), 3);
        assert!(sections[0].props.columns.is_none());
        let cols = sections[1].props.columns.as_ref().unwrap();
        assert_eq!(cols.count, 2);
        assert_eq!(cols.space, 708);
        assert!(sections[2].props.columns.is_none());
    }

    #[test]
    fn margins_attach_to_leading_section_only() {
        let mut page = PageOptions::default();
        page.margins.top = Some(Margin::new(2.0, Unit::Cm));
        let blocks = vec![
            para(),
            Block::Columns(ColumnSection {
                widths: vec![100.0],
                children: vec![],
            }),
        ];
        let sections = assemble(blocks, &page, &NoImages);
        let m = sections[0].props.margins.as_ref().unwrap();
        assert_eq!(m.top, 1134);
        assert_eq!(m.left, 1440);
        assert!(sections[1].props.margins.is_none());
    }

    #[test]
    fn notes_replace_placeholder_before_bibliography() {
        let mut blocks = vec![para(), Block::NotePlaceholder, para()];
        let notes = vec![vec![ParagraphChild::Run(Run::text("a note"))]];
        finalize_notes(
            &mut blocks,
            &notes,
            FootnoteMode::BeforeBibliography,
            &"Footnotes".into(),
        );
        assert_eq!(blocks.len(), 5);
        assert!(!blocks.iter().any(|b| matches!(b, Block::NotePlaceholder)));
        let Block::Paragraph(numbered) = &blocks[3] else {
            panic!("expected note paragraph");
        };
        assert_eq!(
            numbered.options.style.as_deref(),
            Some("Bibliography")
        );
        let ParagraphChild::Run(first) = &numbered.children[0] else {
            panic!("expected numbering run");
        };
        assert_eq!(first.children, vec![RunChild::Text("1. ".into())]);
    }

    #[test]
    fn notes_append_at_end_of_document() {
        let mut blocks = vec![para()];
        let notes = vec![vec![ParagraphChild::Run(Run::text("a"))]];
        finalize_notes(
            &mut blocks,
            &notes,
            FootnoteMode::EndOfDocument,
            &"Footnotes".into(),
        );
        assert_eq!(blocks.len(), 4);
    }

    #[test]
    fn placeholder_never_survives() {
        let mut blocks = vec![Block::NotePlaceholder, para(), Block::NotePlaceholder];
        finalize_notes(&mut blocks, &[], FootnoteMode::Inline, &"Footnotes".into());
        assert_eq!(blocks.len(), 1);
    }
}
