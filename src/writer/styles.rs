//! Document style definitions for the `.docx` lowering.

use docx_rs::*;

/// Style set registered into every produced document.
#[derive(Clone, Debug, Default)]
pub struct DocxStyles;

impl DocxStyles {
    pub fn new() -> Self {
        Self
    }

    fn heading(name: &str, display_name: &str, size: usize) -> Style {
        Style::new(name, StyleType::Paragraph)
            .name(display_name)
            .size(size)
            .bold()
    }

    /// Registers every style id the serializer emits.
    pub fn initialize_styles(&self, docx: Docx) -> Docx {
        let normal_para = Style::new("NormalPara", StyleType::Paragraph).name("Normal Paragraph");

        let courier_fonts = RunFonts::new()
            .ascii("Courier New")
            .hi_ansi("Courier New")
            .east_asia("Courier New")
            .cs("Courier New");

        let block_code = Style::new("BlockCode", StyleType::Paragraph)
            .name("Block Code")
            .fonts(courier_fonts)
            .size(18);

        let intense_quote = Style::new("IntenseQuote", StyleType::Paragraph)
            .name("Intense Quote")
            .indent(Some(720), None, None, None)
            .italic();

        let aside = Style::new("Aside", StyleType::Paragraph)
            .name("Aside")
            .italic()
            .size(16)
            .align(AlignmentType::Center);

        let hyperlink = Style::new("Hyperlink", StyleType::Character)
            .name("Hyperlink")
            .color("0000FF")
            .underline("single");

        let math_inline = Style::new("MathInline", StyleType::Character)
            .name("Math Inline")
            .italic();

        let table_cell = Style::new("TableCell", StyleType::Paragraph).name("Table Cell");

        let numbered_list =
            Style::new("NumberedList", StyleType::Paragraph).name("Numbered List");
        let bullet_list = Style::new("BulletList", StyleType::Paragraph).name("Bullet List");

        let bibliography_title = Style::new("BibliographyTitle", StyleType::Paragraph)
            .name("Bibliography Title")
            .size(28)
            .bold();

        let bibliography = Style::new("Bibliography", StyleType::Paragraph).name("Bibliography");

        let footnote_list = Style::new("FootnoteList", StyleType::Paragraph)
            .name("Footnote List")
            .size(18);

        let footnote_reference = Style::new("FootnoteReference", StyleType::Character)
            .name("Footnote Reference")
            .size(16);

        let horizontal_line = Style::new("HorizontalLine", StyleType::Paragraph)
            .name("Horizontal Line")
            .align(AlignmentType::Center);

        let table = Style::new("Table", StyleType::Table)
            .name("Table")
            .table_align(TableAlignmentType::Center);

        let docx = docx
            .add_style(normal_para)
            .add_style(Self::heading("Heading1", "Heading 1", 32))
            .add_style(Self::heading("Heading2", "Heading 2", 28))
            .add_style(Self::heading("Heading3", "Heading 3", 26))
            .add_style(Self::heading("Heading4", "Heading 4", 24))
            .add_style(Self::heading("Heading5", "Heading 5", 22))
            .add_style(Self::heading("Heading6", "Heading 6", 20));

        docx.add_style(block_code)
            .add_style(intense_quote)
            .add_style(aside)
            .add_style(hyperlink)
            .add_style(math_inline)
            .add_style(table_cell)
            .add_style(numbered_list)
            .add_style(bullet_list)
            .add_style(bibliography_title)
            .add_style(bibliography)
            .add_style(footnote_list)
            .add_style(footnote_reference)
            .add_style(horizontal_line)
            .add_style(table)
    }
}
