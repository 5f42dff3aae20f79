//! Table and multi-column region rendering.

use std::mem;

use super::core::MAX_IMAGE_WIDTH;
use super::SerializerState;
use crate::ir;
use crate::model::{
    Block, ColumnSection, Paragraph, ParagraphChild, ParagraphOptions, ParagraphSpacing, Table,
    TableCell, TableRow,
};
use crate::Result;

impl SerializerState<'_> {
    /// Renders a table. Cell content goes through an isolated block
    /// buffer; the cell width percent is memoized from the first row;
    /// the image budget narrows to the per-cell share while inside. A
    /// spacer paragraph follows the table so adjacent tables stay
    /// separate.
    pub fn table(&mut self, rows: &[ir::TableRow]) -> Result<()> {
        let outer_blocks = mem::take(&mut self.blocks);
        let saved_width = self.max_image_width;
        let cell_opts = ParagraphOptions {
            style: Some("TableCell".into()),
            ..Default::default()
        };

        let mut out_rows = Vec::with_capacity(rows.len());
        let mut percent = 0.0f32;
        let mut result = Ok(());
        'rows: for row in rows {
            let header = !row.cells.is_empty() && row.cells.iter().all(|c| c.header);
            let count = row.cells.len().max(1);
            self.max_image_width = MAX_IMAGE_WIDTH / count as f32;
            if percent == 0.0 {
                percent = (10000.0 / count as f32).round() / 100.0;
            }
            let mut cells = Vec::with_capacity(row.cells.len());
            for cell in &row.cells {
                self.blocks = Vec::new();
                if let Err(err) = self.render_block_children_with(&cell.children, Some(&cell_opts))
                {
                    result = Err(err);
                    break 'rows;
                }
                cells.push(TableCell {
                    width_percent: percent,
                    colspan: cell.colspan.max(1),
                    rowspan: cell.rowspan.max(1),
                    blocks: mem::take(&mut self.blocks),
                });
            }
            out_rows.push(TableRow { header, cells });
        }

        self.max_image_width = saved_width;
        self.blocks = outer_blocks;
        result?;
        self.blocks.push(Block::Table(Table { rows: out_rows }));
        self.blocks.push(Block::Paragraph(Paragraph::default()));
        Ok(())
    }

    /// Renders a multi-column region as one standalone section with a
    /// column break between every pair of consecutive columns. The image
    /// budget scales to each column's width basis while inside.
    pub fn columns(&mut self, columns: &[ir::Column]) -> Result<()> {
        if columns.is_empty() {
            return Ok(());
        }
        let outer_blocks = mem::take(&mut self.blocks);
        let saved_width = self.max_image_width;

        let mut items = Vec::new();
        let mut widths = Vec::with_capacity(columns.len());
        let mut result = Ok(());
        for (idx, column) in columns.iter().enumerate() {
            if idx > 0 {
                items.push(Block::Paragraph(Paragraph {
                    options: ParagraphOptions {
                        spacing: Some(ParagraphSpacing {
                            line: 0,
                            before: 0,
                            after: 0,
                        }),
                        ..Default::default()
                    },
                    children: vec![ParagraphChild::ColumnBreak],
                }));
            }
            widths.push(column.basis);
            self.max_image_width = MAX_IMAGE_WIDTH * column.basis / 100.0;
            self.blocks = Vec::new();
            if let Err(err) = self.render_block_children(&column.children) {
                result = Err(err);
                break;
            }
            items.append(&mut self.blocks);
        }

        self.max_image_width = saved_width;
        self.blocks = outer_blocks;
        result?;
        self.blocks.push(Block::Columns(ColumnSection {
            widths,
            children: items,
        }));
        self.blocks.push(Block::Paragraph(Paragraph::default()));
        Ok(())
    }
}
