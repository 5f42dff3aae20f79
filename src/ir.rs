//! Source document tree for the serializer.
//!
//! This is a closed tagged union of the node and mark kinds the editor
//! schema can produce. Dispatch over it is an exhaustive match; the
//! `Custom` variant is the explicit catch-all for schema extensions and
//! says whether a default rendering applies.

use ecow::EcoString;

/// A complete source document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Doc {
    pub children: Vec<Node>,
}

/// Block- and inline-level source nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text {
        text: EcoString,
        marks: Vec<Mark>,
    },
    Paragraph {
        /// Marks the single designated splice point for end-of-document
        /// notes. The paragraph renders as a placeholder block instead of
        /// its content.
        footnotes_hole: bool,
        children: Vec<Node>,
    },
    Heading {
        level: u8,
        children: Vec<Node>,
    },
    /// Document title; honors the page-split mode by breaking before
    /// itself when earlier content exists.
    Title {
        level: u8,
        children: Vec<Node>,
    },
    Blockquote {
        children: Vec<Node>,
    },
    CodeBlock {
        text: EcoString,
    },
    HorizontalRule,
    HardBreak,
    OrderedList {
        children: Vec<Node>,
    },
    BulletList {
        children: Vec<Node>,
    },
    ListItem {
        children: Vec<Node>,
    },
    Table {
        rows: Vec<TableRow>,
    },
    Columns {
        columns: Vec<Column>,
    },
    Image {
        src: EcoString,
        title: EcoString,
        layout: Align,
        width_percent: f32,
    },
    /// Inline image at its natural size, or scaled down to `max_height`
    /// pixels. Zero means no height cap.
    ImageInline {
        src: EcoString,
        max_height: u32,
    },
    /// Bookmarked caption label with a live sequence counter, followed
    /// by the caption text.
    Caption {
        id: Option<EcoString>,
        kind: EcoString,
        children: Vec<Node>,
    },
    Math {
        tex: EcoString,
        display: bool,
        numbered: bool,
        id: Option<EcoString>,
    },
    Link {
        href: EcoString,
        children: Vec<Node>,
    },
    FootnoteRef {
        id: EcoString,
    },
    Comment {
        text: EcoString,
        create_date: Option<EcoString>,
        children: Vec<Node>,
    },
    /// Inline citation. Full citations substitute pre-resolved literal
    /// text; others render their children, hyperlink-wrapped when the id
    /// carries a recognized external reference URI.
    Citation {
        cite_id: EcoString,
        full: bool,
        children: Vec<Node>,
    },
    /// Citation resolved through the citation service by reference id.
    CitationRef {
        id: EcoString,
    },
    /// Grouped citation carrying its pre-rendered text.
    GroupCitation {
        text: EcoString,
    },
    /// Citation whose display content is embedded raw markup.
    CitationDisplay {
        markup: EcoString,
        children: Vec<Node>,
    },
    Bibliography {
        children: Vec<Node>,
    },
    /// Catch-all for schema extensions without a dedicated handler.
    Custom {
        type_name: EcoString,
        kind: CustomKind,
        children: Vec<Node>,
    },
}

/// How an unregistered node kind is treated by the default dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomKind {
    /// Atomic or leaf node; emits nothing.
    Atomic,
    /// Inline container; children recurse inline.
    Inline,
    /// Block container; children recurse as blocks.
    Block,
    /// No default applies; hitting this is a schema mismatch.
    Opaque,
}

/// Inline formatting marks. Unordered but composable; descriptors merge
/// in mark-list order with later marks winning on field collision.
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Underline { line: Option<EcoString> },
    SmallCaps,
    AllCaps,
    Superscript,
    Subscript,
    Color { color: EcoString },
    FontFamily { font: EcoString },
    FontSize { px: u32 },
    Highlight { color: EcoString },
    Abbr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

/// A table row in the source tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// A table cell in the source tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub header: bool,
    pub colspan: usize,
    pub rowspan: usize,
    pub children: Vec<Node>,
}

/// One column of a multi-column region, with its width basis in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub basis: f32,
    pub children: Vec<Node>,
}

impl Node {
    /// Plain paragraph from inline children.
    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Paragraph {
            footnotes_hole: false,
            children,
        }
    }

    /// Unmarked text leaf.
    pub fn text(text: impl Into<EcoString>) -> Self {
        Node::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> EcoString {
        let mut out = EcoString::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut EcoString) {
        match self {
            Node::Text { text, .. } => out.push_str(text),
            Node::CodeBlock { text } | Node::GroupCitation { text } => out.push_str(text),
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Child nodes, empty for leaves.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Paragraph { children, .. }
            | Node::Heading { children, .. }
            | Node::Title { children, .. }
            | Node::Blockquote { children }
            | Node::OrderedList { children }
            | Node::BulletList { children }
            | Node::ListItem { children }
            | Node::Link { children, .. }
            | Node::Caption { children, .. }
            | Node::Comment { children, .. }
            | Node::Citation { children, .. }
            | Node::CitationDisplay { children, .. }
            | Node::Bibliography { children }
            | Node::Custom { children, .. } => children,
            _ => &[],
        }
    }
}
