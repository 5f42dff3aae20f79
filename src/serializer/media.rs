//! Images, asides, code blocks and caption labels.

use ecow::{eco_format, EcoString};
use log::warn;

use super::core::normalize_text;
use super::SerializerState;
use crate::ir::{self, Align};
use crate::model::{
    Block, Bookmark, ImageRun, Paragraph, ParagraphChild, ParagraphOptions, Run, RunChild,
    RunFormat,
};
use crate::Result;

impl SerializerState<'_> {
    /// Emits a block image scaled against the current width budget,
    /// keeping aspect. An unresolvable source is logged and skipped.
    pub fn image(&mut self, src: &str, align: Align, width_percent: f32) {
        let buf = match self.cfg.image_resolver.resolve(src) {
            Ok(buf) => buf,
            Err(err) => {
                warn!("image `{src}` could not be resolved: {err}");
                return;
            }
        };
        let aspect = buf.height as f32 / buf.width.max(1) as f32;
        let width = self.max_image_width * (width_percent / 100.0);
        self.current.push(ParagraphChild::Run(Run {
            format: RunFormat::default(),
            children: vec![RunChild::Image(ImageRun {
                data: buf.data,
                width: width.round() as u32,
                height: (width * aspect).round() as u32,
            })],
        }));
        self.add_paragraph_options(ParagraphOptions {
            alignment: Some(align),
            style: Some("Normal".into()),
            ..Default::default()
        });
    }

    /// Emits an inline image at its natural size, or scaled down to
    /// `max_height` keeping aspect.
    pub fn image_inline(&mut self, src: &str, max_height: u32) {
        let buf = match self.cfg.image_resolver.resolve(src) {
            Ok(buf) => buf,
            Err(err) => {
                warn!("inline image `{src}` could not be resolved: {err}");
                return;
            }
        };
        let (width, height) = if max_height > 0 && buf.height > 0 {
            let aspect = buf.width as f32 / buf.height as f32;
            ((max_height as f32 * aspect).round() as u32, max_height)
        } else {
            (buf.width, buf.height)
        };
        self.current.push(ParagraphChild::Run(Run {
            format: RunFormat::default(),
            children: vec![RunChild::Image(ImageRun {
                data: buf.data,
                width,
                height,
            })],
        }));
    }

    /// Pushes a caption paragraph directly, bypassing the run buffer.
    pub fn aside(&mut self, text: EcoString) {
        self.blocks.push(Block::Paragraph(Paragraph {
            options: ParagraphOptions {
                style: Some("Aside".into()),
                ..Default::default()
            },
            children: vec![ParagraphChild::Run(Run::text(text))],
        }));
    }

    /// Emits a code block as one paragraph, lines joined by explicit
    /// breaks. Empty content emits nothing.
    pub fn code_block(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let normalized = normalize_text(text);
        let children = normalized
            .split('\n')
            .enumerate()
            .map(|(idx, line)| {
                ParagraphChild::Run(Run {
                    format: RunFormat {
                        break_before: idx > 0,
                        ..Default::default()
                    },
                    children: vec![RunChild::Text(line.into())],
                })
            })
            .collect();
        self.blocks.push(Block::Paragraph(Paragraph {
            options: ParagraphOptions {
                style: Some("BlockCode".into()),
                ..Default::default()
            },
            children,
        }));
    }

    /// Renders a caption paragraph: the bookmarked label, a separating
    /// space, then the caption content.
    pub(crate) fn caption(
        &mut self,
        id: Option<&EcoString>,
        kind: &EcoString,
        children: &[ir::Node],
    ) -> Result<()> {
        let id = match id {
            Some(id) => id.clone(),
            None => {
                self.bookmark_seq += 1;
                eco_format!("caption-{}", self.bookmark_seq)
            }
        };
        self.caption_label(id, kind);
        if !children.is_empty() {
            self.text(" ", RunFormat::default());
            self.render_inline(children)?;
        }
        self.close_block(Some(ParagraphOptions {
            style: Some("Aside".into()),
            ..Default::default()
        }));
        Ok(())
    }

    /// Emits a bookmarked caption label with a live sequence counter,
    /// e.g. `Figure 3`.
    pub fn caption_label(&mut self, id: impl Into<EcoString>, kind: &str) {
        self.current.push(ParagraphChild::Bookmark(Bookmark {
            id: id.into(),
            children: vec![ParagraphChild::Run(Run {
                format: RunFormat::default(),
                children: vec![
                    RunChild::Text(eco_format!("{kind} ")),
                    RunChild::Sequence(kind.into()),
                ],
            })],
        }));
    }
}
