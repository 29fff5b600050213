//! Table converter - converts tables to HTML with merge support.

use super::table_grid;
use super::{ConversionContext, ParagraphConverter};
use crate::core::ast::BlockNode;
use crate::render::HtmlRenderer;
use crate::Result;
use rs_docx::document::{Table, TableCell, TableCellContent};

/// Converter for Table elements.
pub struct TableConverter;

impl TableConverter {
    /// Converts a Table to a `table.docx-table` element.
    pub fn convert<'a>(table: &Table<'a>, context: &mut ConversionContext<'a>) -> Result<String> {
        let grid = table_grid::build_grid(table, |cell| Self::convert_cell_content(cell, context))?;
        Ok(table_grid::render_grid(grid))
    }

    fn convert_cell_content<'a>(
        cell: &TableCell<'a>,
        context: &mut ConversionContext<'a>,
    ) -> Result<String> {
        let mut blocks = Vec::new();
        for item in &cell.content {
            match item {
                TableCellContent::Paragraph(para) => {
                    if let Some(block) = ParagraphConverter::convert(para, context)? {
                        blocks.push(block);
                    }
                }
                TableCellContent::Table(table) => {
                    blocks.push(BlockNode::TableHtml(TableConverter::convert(table, context)?));
                }
            }
        }
        Ok(HtmlRenderer.render_blocks(&blocks).trim_end().to_string())
    }
}
