//! Document model to `.docx` lowering.

use std::collections::HashMap;
use std::io::Cursor;

use docx_rs::*;
use ecow::EcoString;
use log::debug;

use super::styles::DocxStyles;
use crate::ir;
use crate::model;
use crate::Result;

/// Pixels to EMU.
const EMU_PER_PX: u32 = 9525;

/// Writes a [`model::DocumentModel`] as a `.docx` file.
pub struct DocxWriter {
    styles: DocxStyles,
}

impl Default for DocxWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxWriter {
    pub fn new() -> Self {
        Self {
            styles: DocxStyles::new(),
        }
    }

    /// Builds and packs the document.
    pub fn write(&self, doc: &model::DocumentModel) -> Result<Vec<u8>> {
        let mut docx = Docx::new();
        docx = self.styles.initialize_styles(docx);

        let mut refs: HashMap<EcoString, usize> = HashMap::new();
        for (idx, numbering) in doc.numbering.iter().enumerate() {
            let id = idx + 1;
            refs.insert(numbering.reference.clone(), id);
            let mut abs = AbstractNumbering::new(id);
            for level in &numbering.levels {
                let lvl = Level::new(
                    level.level,
                    Start::new(1),
                    NumberFormat::new(level.format.as_str()),
                    LevelText::new(level.text.as_str()),
                    LevelJc::new("left"),
                )
                .indent(
                    Some(level.indent),
                    Some(SpecialIndentType::Hanging(level.hanging)),
                    None,
                    None,
                );
                abs = abs.add_level(lvl);
            }
            docx = docx
                .add_abstract_numbering(abs)
                .add_numbering(Numbering::new(id, id));
        }

        if let Some(leading) = doc.sections.first() {
            if let Some(m) = &leading.props.margins {
                docx = docx.page_margin(
                    PageMargin::new()
                        .top(m.top)
                        .right(m.right)
                        .bottom(m.bottom)
                        .left(m.left),
                );
            }
            if let Some(header) = &leading.props.header {
                docx = docx.header(
                    Header::new().add_paragraph(self.paragraph(&header.paragraph, &refs)),
                );
            }
            if let Some(footer) = &leading.props.footer {
                docx = docx.footer(
                    Footer::new().add_paragraph(self.paragraph(&footer.paragraph, &refs)),
                );
            }
        }

        for section in &doc.sections {
            if let Some(cols) = &section.props.columns {
                debug!("flattening a {}-column section", cols.count);
            }
            for block in &section.children {
                docx = self.block(docx, block, &refs);
            }
        }

        if !doc.comments.is_empty() {
            debug!("{} comments not lowered", doc.comments.len());
        }
        if !doc.footnotes.is_empty() {
            debug!("{} footnote bodies not lowered", doc.footnotes.len());
        }

        let built = docx.build();
        let mut buffer = Vec::new();
        built
            .pack(&mut Cursor::new(&mut buffer))
            .map_err(|e| format!("failed to pack document: {e}"))?;
        Ok(buffer)
    }

    fn block(&self, docx: Docx, block: &model::Block, refs: &HashMap<EcoString, usize>) -> Docx {
        match block {
            model::Block::Paragraph(p) => docx.add_paragraph(self.paragraph(p, refs)),
            model::Block::Table(t) => docx.add_table(self.table(t, refs)),
            model::Block::Columns(cols) => cols
                .children
                .iter()
                .fold(docx, |docx, block| self.block(docx, block, refs)),
            // Finalization removes placeholders before lowering.
            model::Block::NotePlaceholder => docx,
        }
    }

    fn paragraph(
        &self,
        p: &model::Paragraph,
        refs: &HashMap<EcoString, usize>,
    ) -> Paragraph {
        let opts = &p.options;
        let mut para = Paragraph::new();
        if let Some(style) = &opts.style {
            para = para.style(style.as_str());
        }
        if opts.thematic_break {
            para = para.style("HorizontalLine");
        }
        if let Some(align) = opts.alignment {
            para = para.align(map_align(align));
        }
        if opts.page_break_before {
            para = para.page_break_before(true);
        }
        if let Some(numbering) = &opts.numbering {
            if let Some(&id) = refs.get(&numbering.reference) {
                para = para.numbering(NumberingId::new(id), IndentLevel::new(numbering.level));
            }
        }
        if opts.spacing.is_some() || !opts.tab_stops.is_empty() {
            debug!("paragraph spacing and tab stops skipped in lowering");
        }
        for child in &p.children {
            para = self.paragraph_child(para, child);
        }
        para
    }

    fn paragraph_child(&self, mut para: Paragraph, child: &model::ParagraphChild) -> Paragraph {
        match child {
            model::ParagraphChild::Run(r) => {
                let run = self.run(r);
                if !run.children.is_empty() {
                    para = para.add_run(run);
                }
            }
            model::ParagraphChild::Hyperlink(link) => {
                let mut hyperlink = Hyperlink::new(link.href.as_str(), HyperlinkType::External);
                for run in self.collect_runs(&link.children) {
                    if !run.children.is_empty() {
                        hyperlink = hyperlink.add_run(run);
                    }
                }
                para = para.add_hyperlink(hyperlink);
            }
            model::ParagraphChild::Bookmark(bookmark) => {
                debug!("bookmark `{}` anchors skipped in lowering", bookmark.id);
                for inner in &bookmark.children {
                    para = self.paragraph_child(para, inner);
                }
            }
            model::ParagraphChild::Math(math) => {
                para = para.add_run(Run::new().style("MathInline").add_text(math.tex.as_str()));
            }
            model::ParagraphChild::CommentRangeStart(_)
            | model::ParagraphChild::CommentRangeEnd(_)
            | model::ParagraphChild::CommentReference(_) => {
                debug!("comment anchors skipped in lowering");
            }
            model::ParagraphChild::FootnoteReference(idx) => {
                para = para.add_run(
                    Run::new()
                        .style("FootnoteReference")
                        .add_text(format!("{idx}")),
                );
            }
            model::ParagraphChild::ColumnBreak => {
                para = para.add_run(Run::new().add_break(BreakType::Column));
            }
        }
        para
    }

    /// Flattens nested paragraph children into runs for containers that
    /// only accept runs.
    fn collect_runs(&self, children: &[model::ParagraphChild]) -> Vec<Run> {
        let mut runs = Vec::new();
        for child in children {
            match child {
                model::ParagraphChild::Run(r) => runs.push(self.run(r)),
                model::ParagraphChild::Hyperlink(link) => {
                    runs.extend(self.collect_runs(&link.children));
                }
                model::ParagraphChild::Bookmark(bookmark) => {
                    runs.extend(self.collect_runs(&bookmark.children));
                }
                model::ParagraphChild::Math(math) => {
                    runs.push(Run::new().style("MathInline").add_text(math.tex.as_str()));
                }
                _ => debug!("non-run content dropped inside hyperlink"),
            }
        }
        runs
    }

    fn run(&self, r: &model::Run) -> Run {
        let f = &r.format;
        let mut run = Run::new();
        if let Some(style) = &f.style {
            run = run.style(style.as_str());
        }
        if f.bold == Some(true) {
            run = run.bold();
        }
        if f.italics == Some(true) {
            run = run.italic();
        }
        if f.strike == Some(true) {
            run = run.strike();
        }
        if let Some(line) = &f.underline {
            run = run.underline(line.as_str());
        }
        if let Some(color) = &f.color {
            run = run.color(color.as_str());
        }
        if let Some(size) = f.size {
            run = run.size(size);
        }
        if let Some(font) = &f.font {
            run = run.fonts(RunFonts::new().ascii(font.as_str()).hi_ansi(font.as_str()));
        }
        if let Some(highlight) = &f.highlight {
            run = run.highlight(highlight.as_str());
        }
        if f.small_caps.is_some() || f.all_caps.is_some() || f.script.is_some() {
            debug!("caps and script formatting skipped in lowering");
        }
        if f.break_before {
            run = run.add_break(BreakType::TextWrapping);
        }
        for child in &r.children {
            match child {
                model::RunChild::Text(text) => run = run.add_text(text.as_str()),
                model::RunChild::Break => run = run.add_break(BreakType::TextWrapping),
                model::RunChild::Image(img) => run = self.image_run(run, img),
                model::RunChild::Sequence(kind) => {
                    debug!("sequence field `{kind}` skipped in lowering");
                }
            }
        }
        run
    }

    /// Embeds an image, converting formats the packaging library does
    /// not accept to PNG.
    fn image_run(&self, run: Run, img: &model::ImageRun) -> Run {
        let (width, height) = (img.width * EMU_PER_PX, img.height * EMU_PER_PX);
        match image::guess_format(&img.data) {
            Ok(image::ImageFormat::Png) | Ok(image::ImageFormat::Jpeg) => {
                run.add_image(Pic::new(&img.data).size(width, height))
            }
            Ok(_) => match image::load_from_memory(&img.data) {
                Ok(decoded) => {
                    let mut buffer = Vec::new();
                    if decoded
                        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
                        .is_ok()
                    {
                        run.add_image(Pic::new(&buffer).size(width, height))
                    } else {
                        run.add_text("[image conversion error]")
                    }
                }
                Err(_) => run.add_text("[image loading error]"),
            },
            Err(_) => run.add_text("[unknown image format]"),
        }
    }

    fn table(&self, t: &model::Table, refs: &HashMap<EcoString, usize>) -> Table {
        let mut table = Table::new(vec![]).style("Table");
        for row in &t.rows {
            let mut cells = Vec::with_capacity(row.cells.len());
            for cell in &row.cells {
                let width = (cell.width_percent * 50.0).round() as usize;
                let mut tc = TableCell::new().width(width, WidthType::Pct);
                if cell.colspan > 1 {
                    tc = tc.grid_span(cell.colspan);
                }
                if cell.rowspan > 1 {
                    tc = tc.vertical_merge(VMergeType::Restart);
                }
                for block in &cell.blocks {
                    match block {
                        model::Block::Paragraph(p) => {
                            tc = tc.add_paragraph(self.paragraph(p, refs));
                        }
                        other => {
                            debug!("non-paragraph cell content skipped in lowering: {other:?}");
                        }
                    }
                }
                cells.push(tc);
            }
            if row.header {
                debug!("header row flag not lowered");
            }
            table = table.add_row(TableRow::new(cells));
        }
        table
    }
}

fn map_align(align: ir::Align) -> AlignmentType {
    match align {
        ir::Align::Left => AlignmentType::Left,
        ir::Align::Center => AlignmentType::Center,
        ir::Align::Right => AlignmentType::Right,
    }
}
