//! Inline rendering: marks, links, math and citations.

use std::mem;
use std::sync::OnceLock;

use ecow::{eco_format, EcoString};
use log::{debug, warn};
use regex::Regex;

use super::core::LinkFrame;
use super::SerializerState;
use crate::ir::{self, Mark};
use crate::model::{
    Bookmark, Hyperlink, MathRun, ParagraphChild, ParagraphOptions, Run, RunChild, RunFormat,
    Script, TabStop, TabStopKind,
};
use crate::Result;

/// Rightmost usable tab position, twips.
const TAB_STOP_MAX: usize = 9026;

/// Highlight swatches keyed by the editor's rgba values.
const HIGHLIGHTS: [(&str, &str); 7] = [
    ("rgba(255, 195, 0, 0.2)", "yellow"),
    ("rgba(255, 90, 90, 0.18)", "red"),
    ("rgba(166, 125, 255, 0.15)", "magenta"),
    ("rgba(158, 255, 0, 0.2)", "green"),
    ("rgba(52, 226, 216, 0.2)", "blue"),
    ("rgba(255, 154, 61, 0.15)", "darkYellow"),
    ("rgba(135, 135, 135, 0.2)", "lightGray"),
];

/// Formatting contributed by one mark. Pure; composition happens by
/// merging in mark-list order.
pub fn mark_format(mark: &Mark) -> RunFormat {
    match mark {
        Mark::Bold => RunFormat {
            bold: Some(true),
            ..Default::default()
        },
        Mark::Italic => RunFormat {
            italics: Some(true),
            ..Default::default()
        },
        Mark::Strike => RunFormat {
            strike: Some(true),
            ..Default::default()
        },
        Mark::Underline { line } => RunFormat {
            underline: Some(underline_type(line.as_deref())),
            ..Default::default()
        },
        Mark::SmallCaps => RunFormat {
            small_caps: Some(true),
            ..Default::default()
        },
        Mark::AllCaps => RunFormat {
            all_caps: Some(true),
            ..Default::default()
        },
        Mark::Superscript => RunFormat {
            script: Some(Script::Superscript),
            ..Default::default()
        },
        Mark::Subscript => RunFormat {
            script: Some(Script::Subscript),
            ..Default::default()
        },
        Mark::Color { color } => RunFormat {
            color: Some(color_to_hex(color)),
            ..Default::default()
        },
        Mark::FontFamily { font } => RunFormat {
            font: Some(if font.is_empty() {
                "sans-serif".into()
            } else {
                font.clone()
            }),
            ..Default::default()
        },
        Mark::FontSize { px } => RunFormat {
            size: Some((*px as usize * 3 + 1) / 2),
            ..Default::default()
        },
        Mark::Highlight { color } => RunFormat {
            highlight: HIGHLIGHTS
                .iter()
                .find(|(value, _)| *value == color.as_str())
                .map(|(_, name)| (*name).into()),
            ..Default::default()
        },
        Mark::Abbr => RunFormat::default(),
    }
}

fn underline_type(line: Option<&str>) -> EcoString {
    match line.unwrap_or("solid") {
        "double" => "double".into(),
        "dotted" => "dotted".into(),
        "dashed" => "dash".into(),
        "wavy" => "wave".into(),
        _ => "single".into(),
    }
}

/// `#rrggbb`, `#rgb` or `rgb(r, g, b)` to a bare hex sextet. Anything
/// unrecognized renders black.
fn color_to_hex(color: &str) -> EcoString {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return hex.into();
        }
        if hex.len() == 3 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let mut out = EcoString::new();
            for c in hex.chars() {
                out.push(c);
                out.push(c);
            }
            return out;
        }
    }
    if let Some(body) = color
        .strip_prefix("rgb(")
        .or_else(|| color.strip_prefix("rgba("))
        .and_then(|s| s.strip_suffix(')'))
    {
        let mut channels = body.split(',').map(|p| p.trim().parse::<u8>());
        if let (Some(Ok(r)), Some(Ok(g)), Some(Ok(b))) =
            (channels.next(), channels.next(), channels.next())
        {
            return eco_format!("{r:02X}{g:02X}{b:02X}");
        }
    }
    "000000".into()
}

fn external_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\(\[(.*?)\]\((zotero://(.*?))\)\)").expect("external reference pattern")
    })
}

impl SerializerState<'_> {
    /// Renders an inline child sequence into the open buffer.
    pub fn render_inline(&mut self, children: &[ir::Node]) -> Result<()> {
        for child in children {
            self.render_node(child)?;
        }
        Ok(())
    }

    /// Opens a hyperlink context. An already open link closes first;
    /// nested links flatten into siblings.
    pub fn open_link(&mut self, href: EcoString) {
        self.add_run_format(RunFormat {
            style: Some("Hyperlink".into()),
            ..Default::default()
        });
        if self.open_link.is_some() {
            debug!("link opened while `{href}` context pending, closing previous");
            self.close_link();
        }
        self.open_link = Some(LinkFrame {
            href,
            held: mem::take(&mut self.current),
        });
    }

    /// Closes the open link, wrapping the buffered content and restoring
    /// the held siblings. No-op without an open link.
    pub fn close_link(&mut self) {
        let Some(frame) = self.open_link.take() else {
            return;
        };
        let children = mem::replace(&mut self.current, frame.held);
        self.current.push(ParagraphChild::Hyperlink(Hyperlink {
            href: frame.href,
            children,
        }));
    }

    /// Math content. Display math closes its own block; numbered display
    /// math lays the formula out on tab stops with a bookmarked equation
    /// counter in parentheses.
    pub(crate) fn math(
        &mut self,
        tex: &EcoString,
        display: bool,
        numbered: bool,
        id: Option<&EcoString>,
    ) -> Result<()> {
        if !display {
            self.current
                .push(ParagraphChild::Math(MathRun { tex: tex.clone() }));
            return Ok(());
        }
        if !numbered {
            self.current
                .push(ParagraphChild::Math(MathRun { tex: tex.clone() }));
            self.close_block(Some(ParagraphOptions {
                alignment: Some(ir::Align::Center),
                ..Default::default()
            }));
            return Ok(());
        }
        let id = match id {
            Some(id) => id.clone(),
            None => {
                self.bookmark_seq += 1;
                eco_format!("eq-{}", self.bookmark_seq)
            }
        };
        self.current = vec![
            ParagraphChild::Run(Run::text("\t")),
            ParagraphChild::Math(MathRun { tex: tex.clone() }),
            ParagraphChild::Run(Run::text("\t(")),
            ParagraphChild::Bookmark(Bookmark {
                id,
                children: vec![ParagraphChild::Run(Run {
                    format: RunFormat::default(),
                    children: vec![RunChild::Sequence("Equation".into())],
                })],
            }),
            ParagraphChild::Run(Run::text(")")),
        ];
        self.add_paragraph_options(ParagraphOptions {
            tab_stops: vec![
                TabStop {
                    kind: TabStopKind::Center,
                    position: TAB_STOP_MAX / 2,
                },
                TabStop {
                    kind: TabStopKind::Right,
                    position: TAB_STOP_MAX,
                },
            ],
            ..Default::default()
        });
        self.close_block(None);
        Ok(())
    }

    /// Inline citation. Full citations substitute pre-resolved literal
    /// text split on embedded line breaks; others render their children,
    /// hyperlinked when the id carries an external reference URI.
    pub(crate) fn citation(
        &mut self,
        cite_id: &EcoString,
        full: bool,
        children: &[ir::Node],
    ) -> Result<()> {
        if full {
            let text = self
                .cfg
                .full_cite_contents
                .get(cite_id)
                .cloned()
                .unwrap_or_default();
            for (idx, line) in text.split('\n').enumerate() {
                if idx != 0 {
                    self.add_run_format(RunFormat {
                        break_before: true,
                        ..Default::default()
                    });
                }
                self.text(line, RunFormat::default());
            }
            return Ok(());
        }
        let href = cite_id
            .starts_with("zotero")
            .then(|| {
                external_ref_pattern()
                    .captures_iter(cite_id)
                    .last()
                    .and_then(|cap| cap.get(2))
                    .map(|m| EcoString::from(m.as_str()))
            })
            .flatten();
        if let Some(href) = href {
            self.open_link(href);
            self.render_inline(children)?;
            self.close_link();
        } else {
            self.render_inline(children)?;
        }
        Ok(())
    }

    /// Resolves a citation by reference id. A failed lookup contributes
    /// nothing to the paragraph.
    pub(crate) fn citation_ref(&mut self, id: &EcoString) {
        let Some(resolver) = &self.cfg.citation_resolver else {
            debug!("citation `{id}` skipped, no resolver configured");
            return;
        };
        match resolver.citation(id, "text") {
            Ok(text) => self.text(&text, RunFormat::default()),
            Err(err) => warn!("citation `{id}` lookup failed: {err}"),
        }
    }

    /// Citation whose display content is embedded raw markup; falls back
    /// to the node's own children when the markup is not convertible.
    pub(crate) fn citation_display(
        &mut self,
        markup: &str,
        children: &[ir::Node],
    ) -> Result<()> {
        let transformed = self
            .cfg
            .markup_transformer
            .as_ref()
            .and_then(|t| t.transform(markup));
        match transformed {
            Some(node) => {
                let rendered = node.children().to_vec();
                self.render_inline(&rendered)
            }
            None => self.render_inline(children),
        }
    }
}
