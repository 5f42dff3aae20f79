//! List rendering and numbering context management.

use ecow::eco_format;
use log::debug;

use super::SerializerState;
use crate::error::Error;
use crate::ir;
use crate::model::{NumberingRef, ParagraphChild, ParagraphOptions, Run, RunChild};
use crate::numbering::{create_numbering, ListStyle, MAX_LEVELS};
use crate::Result;

impl SerializerState<'_> {
    /// Renders a list. A root list mints a fresh numbering definition;
    /// a nested list of any style reuses the ancestor reference one
    /// level deeper. The context unwinds symmetrically on return.
    pub fn render_list(&mut self, children: &[ir::Node], style: ListStyle) -> Result<()> {
        match &mut self.current_numbering {
            None => {
                self.numbering_seq += 1;
                let reference = eco_format!("list-{}", self.numbering_seq);
                let overrides = match style {
                    ListStyle::Ordered => self.cfg.numbering.ordered.as_ref(),
                    ListStyle::Bullet => self.cfg.numbering.bullet.as_ref(),
                };
                self.numbering
                    .push(create_numbering(reference.clone(), style, overrides));
                self.current_numbering = Some(NumberingRef {
                    reference,
                    level: 0,
                });
            }
            Some(ctx) => {
                ctx.level += 1;
                if ctx.level >= MAX_LEVELS {
                    debug!("list nesting exceeds {MAX_LEVELS} levels, clamping");
                }
            }
        }

        let opts = ParagraphOptions {
            style: Some(match style {
                ListStyle::Ordered => "NumberedList".into(),
                ListStyle::Bullet => "BulletList".into(),
            }),
            ..Default::default()
        };
        let res = self.render_block_children_with(children, Some(&opts));

        match &mut self.current_numbering {
            Some(ctx) if ctx.level == 0 => self.current_numbering = None,
            Some(ctx) => ctx.level -= 1,
            None => {}
        }
        res
    }

    /// Renders one list item. Consecutive leading paragraph children
    /// flatten into a single numbered paragraph joined by explicit
    /// breaks; the first non-paragraph child ends the flattening and
    /// renders as its own block.
    pub fn render_list_item(&mut self, children: &[ir::Node]) -> Result<()> {
        let Some(numbering) = self.current_numbering.clone() else {
            return Err(Error::invariant("list item outside of any list"));
        };
        self.add_paragraph_options(ParagraphOptions {
            numbering: Some(NumberingRef {
                reference: numbering.reference,
                level: numbering.level.min(MAX_LEVELS - 1),
            }),
            ..Default::default()
        });

        let mut only_paragraph = true;
        for child in children {
            match child {
                ir::Node::Paragraph {
                    footnotes_hole: false,
                    children,
                } if only_paragraph => {
                    if !self.current.is_empty() {
                        self.current.push(ParagraphChild::Run(Run {
                            format: Default::default(),
                            children: vec![RunChild::Break],
                        }));
                    }
                    self.render_inline(children)?;
                }
                other => {
                    if !self.current.is_empty() {
                        self.close_block(None);
                    }
                    only_paragraph = false;
                    self.render_node(other)?;
                }
            }
        }
        if only_paragraph {
            self.close_block(None);
        }
        Ok(())
    }
}
