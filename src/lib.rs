//! # prosedocx
//!
//! Converts a rich editable-document tree into an intermediate
//! word-processor document model, and optionally lowers that model to a
//! `.docx` file.
//!
//! The conversion itself is a single synchronous depth-first pass driven
//! by [`serializer::SerializerState`]; [`DocxSerializer`] is the
//! configured task that runs it.
//!
//! ```no_run
//! use prosedocx::{ir, DocxSerializer};
//! # use prosedocx::options::{ImageBuffer, ImageResolver};
//! # struct Resolver;
//! # impl ImageResolver for Resolver {
//! #     fn resolve(&self, _: &str) -> prosedocx::Result<ImageBuffer> { Err("none".into()) }
//! # }
//!
//! let doc = ir::Doc {
//!     children: vec![ir::Node::paragraph(vec![ir::Node::text("Hello")])],
//! };
//! let model = DocxSerializer::new(Resolver).convert(&doc)?;
//! # Ok::<(), prosedocx::Error>(())
//! ```

pub mod error;
pub mod ir;
pub mod model;
pub mod numbering;
pub mod options;
pub mod section;
pub mod serializer;
pub mod writer;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};

use ecow::EcoString;
use log::warn;

pub use error::Error;
use model::{DocumentModel, Paragraph, ParagraphOptions};
use options::{
    CitationResolver, FootnoteMode, ImageResolver, MarkupTransformer, NumberingOptions,
    PageOptions,
};
use serializer::SerializerState;

/// The result type used by this crate.
pub type Result<T, Err = Error> = std::result::Result<T, Err>;

/// A configured document conversion task.
///
/// Construction is by builder; one task can convert any number of
/// documents, each conversion being an independent single pass.
pub struct DocxSerializer {
    pub(crate) image_resolver: Box<dyn ImageResolver>,
    pub(crate) citation_resolver: Option<Box<dyn CitationResolver>>,
    pub(crate) markup_transformer: Option<Box<dyn MarkupTransformer>>,
    pub(crate) page_options: PageOptions,
    pub(crate) numbering: NumberingOptions,
    /// Pre-resolved literal text for full citations, keyed by cite id.
    pub(crate) full_cite_contents: HashMap<EcoString, EcoString>,
    pub(crate) bibliography_title: EcoString,
    pub(crate) footnote_title: EcoString,
    /// Raw markup bodies of the document's footnotes, in index order.
    pub(crate) footnotes: Vec<EcoString>,
}

impl DocxSerializer {
    pub fn new(image_resolver: impl ImageResolver + 'static) -> Self {
        DocxSerializer {
            image_resolver: Box::new(image_resolver),
            citation_resolver: None,
            markup_transformer: None,
            page_options: PageOptions::default(),
            numbering: NumberingOptions::default(),
            full_cite_contents: HashMap::new(),
            bibliography_title: "Bibliography".into(),
            footnote_title: "Footnotes".into(),
            footnotes: Vec::new(),
        }
    }

    pub fn with_citation_resolver(mut self, resolver: impl CitationResolver + 'static) -> Self {
        self.citation_resolver = Some(Box::new(resolver));
        self
    }

    pub fn with_markup_transformer(
        mut self,
        transformer: impl MarkupTransformer + 'static,
    ) -> Self {
        self.markup_transformer = Some(Box::new(transformer));
        self
    }

    pub fn with_page_options(mut self, page_options: PageOptions) -> Self {
        self.page_options = page_options;
        self
    }

    pub fn with_numbering(mut self, numbering: NumberingOptions) -> Self {
        self.numbering = numbering;
        self
    }

    pub fn with_full_cite_contents(
        mut self,
        contents: HashMap<EcoString, EcoString>,
    ) -> Self {
        self.full_cite_contents = contents;
        self
    }

    pub fn with_bibliography_title(mut self, title: impl Into<EcoString>) -> Self {
        self.bibliography_title = title.into();
        self
    }

    pub fn with_footnote_title(mut self, title: impl Into<EcoString>) -> Self {
        self.footnote_title = title.into();
        self
    }

    pub fn with_footnotes(mut self, footnotes: Vec<EcoString>) -> Self {
        self.footnotes = footnotes;
        self
    }

    /// Converts one document tree into a packaging-ready model.
    ///
    /// Structural failures abort with no partial output; content
    /// resolution failures degrade in place and are logged.
    pub fn convert(&self, doc: &ir::Doc) -> Result<DocumentModel> {
        let mut state = SerializerState::new(self);

        let mut notes = Vec::with_capacity(self.footnotes.len());
        for body in &self.footnotes {
            notes.push(state.render_markup_fragment(body)?);
        }

        state.render_block_children(&doc.children)?;
        let (mut blocks, numbering, comments, referenced) = state.finish();

        if self.page_options.footnote_mode != FootnoteMode::Disabled
            && referenced.len() > notes.len()
        {
            warn!(
                "{} footnote references but only {} bodies provided",
                referenced.len(),
                notes.len()
            );
        }

        section::finalize_notes(
            &mut blocks,
            &notes,
            self.page_options.footnote_mode,
            &self.footnote_title,
        );

        let footnotes = if self.page_options.footnote_mode == FootnoteMode::Inline {
            notes
                .into_iter()
                .enumerate()
                .map(|(idx, children)| {
                    (
                        idx + 1,
                        vec![Paragraph {
                            options: ParagraphOptions {
                                style: Some("FootnoteList".into()),
                                ..Default::default()
                            },
                            children,
                        }],
                    )
                })
                .collect()
        } else {
            BTreeMap::new()
        };

        let sections =
            section::assemble(blocks, &self.page_options, self.image_resolver.as_ref());

        Ok(DocumentModel {
            sections,
            numbering,
            comments,
            footnotes,
        })
    }

    /// Converts one document tree all the way to `.docx` bytes.
    pub fn convert_to_docx(&self, doc: &ir::Doc) -> Result<Vec<u8>> {
        let model = self.convert(doc)?;
        writer::DocxWriter::new().write(&model)
    }
}
